//! A trimmed-down playwright-dotnet checkout, written with CRLF line
//! endings like the real repository.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub const PLAYWRIGHT_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>netstandard2.0</TargetFramework>
    <TreatWarningsAsErrors>true</TreatWarningsAsErrors>
    <Title>Microsoft.Playwright</Title>
    <PackageId>Microsoft.Playwright</PackageId>
    <Summary>The .NET port of Playwright, used to automate Chromium, Firefox and WebKit with a single API.</Summary>
    <Description>Playwright enables reliable end-to-end testing for modern web apps.</Description>
    <Authors>Microsoft Corporation</Authors>
    <RepositoryUrl>https://github.com/microsoft/playwright-dotnet.git</RepositoryUrl>
    <EnablePackageValidation>true</EnablePackageValidation>
  </PropertyGroup>
</Project>
"#;

pub const TESTS_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <IsPackable>false</IsPackable>
  </PropertyGroup>
</Project>
"#;

pub const TARGETS: &str = r#"<Project>
  <PropertyGroup>
    <NuGetPackageId>Microsoft.Playwright</NuGetPackageId>
  </PropertyGroup>
</Project>
"#;

pub const VERSION_PROPS: &str = r#"<Project>
  <PropertyGroup>
    <AssemblyVersion>1.49.0</AssemblyVersion>
    <Authors>Microsoft Corporation</Authors>
    <Owners>Microsoft Corporation</Owners>
    <PackageTags>headless,chrome,firefox,webkit,playwright</PackageTags>
    <PackageProjectUrl>https://github.com/microsoft/playwright-dotnet</PackageProjectUrl>
    <RepositoryUrl>https://github.com/microsoft/playwright-dotnet.git</RepositoryUrl>
    <PackageLicenseExpression>MIT</PackageLicenseExpression>
  </PropertyGroup>
</Project>
"#;

pub const DRIVER_DOWNLOADER: &str = r#"namespace Playwright.Tooling;

internal class DriverDownloader
{
    private const string Cdn = "https://playwright.azureedge.net/builds/driver";

    private static async Task DownloadDriverAsync(HttpClient client, string driverVersion, string platform)
    {
        string cdn = Cdn;
        string url = $"{cdn}/playwright-{driverVersion}-{platform}.zip";
        using var response = await client.GetAsync(url).ConfigureAwait(false);
        response.EnsureSuccessStatusCode();
    }
}
"#;

pub const SCRIPTS_HELPER: &str = r#"using System.Text.Json;

namespace Microsoft.Playwright.Core;

internal static class ScriptsHelper
{
    internal static string AddSourceUrlToScript(string source, string path)
    {
        if (string.IsNullOrEmpty(path))
        {
            return source;
        }

        return $"{source}\n//# sourceURL={path.Replace("\n", string.Empty)}";
    }

    internal static string EvaluationScript(string content, string path)
    {
        if (!string.IsNullOrEmpty(content))
        {
            return content;
        }

        return AddSourceUrlToScript(File.ReadAllText(path), path);
    }
}
"#;

pub const WORKER: &str = r#"using System.Collections.Generic;
using System.Text.Json;
using System.Threading.Tasks;

namespace Microsoft.Playwright.Core;

internal class Worker : ChannelOwner, IWorker
{
    public string Url { get; private set; }

    public async Task<T> EvaluateAsync<T>(string expression, object arg = null)
        => ScriptsHelper.ParseEvaluateResult<T>(await SendMessageToServerAsync<JsonElement?>(
            "evaluateExpression",
            new Dictionary<string, object>
            {
                ["expression"] = expression,
                ["isFunction"] = expression.IsJavascriptFunction(),
                ["arg"] = ScriptsHelper.SerializedArgument(arg),
            }).ConfigureAwait(false));

    public async Task<IJSHandle> EvaluateHandleAsync(string expression, object arg = null)
        => await SendMessageToServerAsync<JSHandle>(
            "evaluateExpressionHandle",
            new Dictionary<string, object>
            {
                ["expression"] = expression,
                ["isFunction"] = expression.IsJavascriptFunction(),
                ["arg"] = ScriptsHelper.SerializedArgument(arg),
            }).ConfigureAwait(false);
}
"#;

pub const IWORKER: &str = r#"#nullable enable

namespace Microsoft.Playwright;

public partial interface IWorker
{
    /// <summary><para>Returns the return value of <paramref name="expression"/>.</para></summary>
    Task<T> EvaluateAsync<T>(string expression, object? arg = default);

    /// <summary><para>Returns the return value as a <see cref="IJSHandle"/>.</para></summary>
    Task<IJSHandle> EvaluateHandleAsync(string expression, object? arg = default);
}

#nullable disable
"#;

pub const JSHANDLE: &str = r#"namespace Microsoft.Playwright.Core;

internal class JSHandle : ChannelOwner, IJSHandle
{
    public async Task<T> EvaluateAsync<T>(string expression, object arg = null)
        => ScriptsHelper.ParseEvaluateResult<T>(await SendMessageToServerAsync<JsonElement?>(
            "evaluateExpression",
            new Dictionary<string, object>
            {
                ["expression"] = expression,
                ["arg"] = ScriptsHelper.SerializedArgument(arg),
            }).ConfigureAwait(false));

    public async Task<IJSHandle> EvaluateHandleAsync(string expression, object arg = null)
        => await SendMessageToServerAsync<JSHandle>(
            "evaluateExpressionHandle",
            new Dictionary<string, object>
            {
                ["expression"] = expression,
                ["arg"] = ScriptsHelper.SerializedArgument(arg),
            }).ConfigureAwait(false);
}
"#;

pub const IJSHANDLE: &str = r#"namespace Microsoft.Playwright;

public partial interface IJSHandle
{
    Task<T> EvaluateAsync<T>(string expression, object? arg = default);

    Task<IJSHandle> EvaluateHandleAsync(string expression, object? arg = default);
}
"#;

pub const IJSHANDLE_SUPPLEMENTS: &str = r#"namespace Microsoft.Playwright;

public partial interface IJSHandle
{
    /// <inheritdoc cref="EvaluateAsync{T}(string, object)"/>
    Task<JsonElement?> EvaluateAsync(string expression, object arg = null);
}
"#;

pub const FRAME: &str = r#"namespace Microsoft.Playwright.Core;

internal class Frame : ChannelOwner, IFrame
{
    public async Task<T> EvaluateAsync<T>(string expression, object arg = null)
        => ScriptsHelper.ParseEvaluateResult<T>(await SendMessageToServerAsync<JsonElement?>(
            "evaluateExpression",
            new Dictionary<string, object>
            {
                ["expression"] = expression,
                ["arg"] = ScriptsHelper.SerializedArgument(arg),
            }).ConfigureAwait(false));

    public async Task<IJSHandle> EvaluateHandleAsync(string script, object args = null)
        => await SendMessageToServerAsync<JSHandle>(
            "evaluateExpressionHandle",
            new Dictionary<string, object>
            {
                ["expression"] = script,
                ["arg"] = ScriptsHelper.SerializedArgument(args),
            }).ConfigureAwait(false);

    public async Task<T> EvalOnSelectorAsync<T>(string selector, string expression, object arg = null)
        => ScriptsHelper.ParseEvaluateResult<T>(await _evalOnSelectorAsync(selector, expression, arg).ConfigureAwait(false));

    public async Task<T> EvalOnSelectorAllAsync<T>(string selector, string expression, object arg = null)
        => ScriptsHelper.ParseEvaluateResult<T>(await _evalOnSelectorAllAsync(selector, expression, arg).ConfigureAwait(false));

    internal Task<JsonElement?> _evalOnSelectorAsync(string selector, string script, object args = null, bool? strict = null)
        => SendMessageToServerAsync<JsonElement?>(
            "evalOnSelector",
            new Dictionary<string, object>
            {
                ["selector"] = selector,
                ["expression"] = script,
                ["arg"] = ScriptsHelper.SerializedArgument(args),
                ["strict"] = strict,
            });

    internal Task<JsonElement?> _evalOnSelectorAllAsync(string selector, string script, object args = null)
        => SendMessageToServerAsync<JsonElement?>(
            "evalOnSelectorAll",
            new Dictionary<string, object>
            {
                ["selector"] = selector,
                ["expression"] = script,
                ["arg"] = ScriptsHelper.SerializedArgument(args),
            });
}
"#;

pub const IFRAME: &str = r#"namespace Microsoft.Playwright;

public partial interface IFrame
{
    Task<T> EvaluateAsync<T>(string expression, object? arg = default);

    Task<IJSHandle> EvaluateHandleAsync(string expression, object? arg = default);

    Task<T> EvalOnSelectorAsync<T>(string selector, string expression, object? arg = default);

    Task<T> EvalOnSelectorAllAsync<T>(string selector, string expression, object? arg = default);
}
"#;

pub const IFRAME_SUPPLEMENTS: &str = r#"namespace Microsoft.Playwright;

public partial interface IFrame
{
    Task<JsonElement?> EvaluateAsync(string expression, object arg = null);

    Task<JsonElement?> EvalOnSelectorAsync(string selector, string expression, object arg = null);
}
"#;

pub const LOCATOR: &str = r#"namespace Microsoft.Playwright.Core;

internal class Locator : ILocator
{
    private readonly Frame _frame;
    private readonly string _selector;

    public Task<T> EvaluateAsync<T>(string expression, object arg = null, LocatorEvaluateOptions options = null)
        => _frame.EvalOnSelectorAsync<T>(_selector, expression, arg);

    public Task<IJSHandle> EvaluateHandleAsync(string expression, object arg = null, LocatorEvaluateHandleOptions options = null)
        => WithElementAsync(async (e, _) => await e.EvaluateHandleAsync(expression, arg).ConfigureAwait(false), options);

    public Task<T> EvaluateAllAsync<T>(string expression, object arg = null)
        => _frame.EvalOnSelectorAllAsync<T>(_selector, expression, arg);
}
"#;

pub const ILOCATOR: &str = r#"namespace Microsoft.Playwright;

public partial interface ILocator
{
    Task<T> EvaluateAsync<T>(string expression, object? arg = default, LocatorEvaluateOptions? options = default);

    Task<IJSHandle> EvaluateHandleAsync(string expression, object? arg = default, LocatorEvaluateHandleOptions? options = default);

    Task<T> EvaluateAllAsync<T>(string expression, object? arg = default);
}
"#;

pub const ILOCATOR_SUPPLEMENTS: &str = r#"namespace Microsoft.Playwright;

public partial interface ILocator
{
    Task<JsonElement?> EvaluateAsync(string expression, object arg = null, LocatorEvaluateOptions options = null);
}
"#;

pub const PAGE: &str = r#"using System.Runtime.CompilerServices;

namespace Microsoft.Playwright.Core;

internal class Page : ChannelOwner, IPage
{
    internal readonly Dictionary<string, Delegate> Bindings = new();

    public BrowserContext Context { get; set; }

    public Frame MainFrame { get; }

    public Task<T> EvaluateAsync<T>(string expression, object arg = null)
        => MainFrame.EvaluateAsync<T>(expression, arg);

    public Task<IJSHandle> EvaluateHandleAsync(string expression, object arg = null)
        => MainFrame.EvaluateHandleAsync(expression, arg);

    public Task<T> EvalOnSelectorAsync<T>(string selector, string expression, object arg = null)
        => MainFrame.EvalOnSelectorAsync<T>(selector, expression, arg);

    public Task<T> EvalOnSelectorAllAsync<T>(string selector, string expression, object arg = null)
        => MainFrame.EvalOnSelectorAllAsync<T>(selector, expression, arg);

    public Task AddInitScriptAsync(string script = null, string scriptPath = null)
        => SendMessageToServerAsync("addInitScript", new Dictionary<string, object>
        {
            ["source"] = ScriptsHelper.EvaluationScript(script, scriptPath),
        });

    private async Task InnerExposeBindingAsync(string name, Delegate callback, bool handle = false)
    {
        if (Bindings.ContainsKey(name))
        {
            throw new PlaywrightException("Function has been already registered");
        }

        Bindings.Add(name, callback);

        await SendMessageToServerAsync(
            "exposeBinding",
            new Dictionary<string, object>
            {
                ["name"] = name,
                ["needsHandle"] = handle,
            }).ConfigureAwait(false);
    }
}
"#;

pub const IPAGE: &str = r#"namespace Microsoft.Playwright;

public partial interface IPage
{
    Task<T> EvaluateAsync<T>(string expression, object? arg = default);

    Task<IJSHandle> EvaluateHandleAsync(string expression, object? arg = default);

    Task<T> EvalOnSelectorAsync<T>(string selector, string expression, object? arg = default);

    Task<T> EvalOnSelectorAllAsync<T>(string selector, string expression, object? arg = default);
}
"#;

pub const IPAGE_SUPPLEMENTS: &str = r#"namespace Microsoft.Playwright;

public partial interface IPage
{
    Task<JsonElement?> EvaluateAsync(string expression, object arg = null);
}
"#;

pub const BROWSER_CONTEXT: &str = r#"using System.Runtime.CompilerServices;

namespace Microsoft.Playwright.Core;

internal class BrowserContext : ChannelOwner, IBrowserContext
{
    internal readonly Dictionary<string, Delegate> Bindings = new();

    public Task ExposeBindingAsync(string name, Action callback, BrowserContextExposeBindingOptions options = default)
        => ExposeBindingAsync(name, callback, handle: options?.Handle ?? false);

    public async Task AddInitScriptAsync(string script = null, string scriptPath = null)
    {
        if (string.IsNullOrEmpty(script))
        {
            script = ScriptsHelper.EvaluationScript(script, scriptPath);
        }

        await SendMessageToServerAsync("addInitScript", new Dictionary<string, object>
        {
            ["source"] = script,
        }).ConfigureAwait(false);
    }

    private async Task ExposeBindingAsync(string name, Delegate callback, bool handle = false)
    {
        if (Bindings.ContainsKey(name))
        {
            throw new PlaywrightException("Function has been already registered");
        }

        Bindings.Add(name, callback);

        await SendMessageToServerAsync(
            "exposeBinding",
            new Dictionary<string, object>
            {
                ["name"] = name,
                ["needsHandle"] = handle,
            }).ConfigureAwait(false);
    }
}
"#;

pub const CLOCK: &str = r#"namespace Microsoft.Playwright.Core;

internal class Clock(BrowserContext browserContext) : IClock
{
    public async Task InstallAsync(ClockInstallOptions options = null)
    {
        var args = new Dictionary<string, object>();
        await browserContext.SendMessageToServerAsync("clockInstall", args).ConfigureAwait(false);
    }
}
"#;

pub const TRACING: &str = r#"namespace Microsoft.Playwright.Core;

internal class Tracing : ChannelOwner, ITracing
{
    public async Task StartAsync(TracingStartOptions options = default)
    {
        await SendMessageToServerAsync("tracingStart", new Dictionary<string, object>
        {
            ["name"] = options?.Name,
            ["screenshots"] = options?.Screenshots,
        }).ConfigureAwait(false);
    }
}
"#;

pub const BROWSER: &str = r#"namespace Microsoft.Playwright.Core;

internal class Browser : ChannelOwner, IBrowser
{
    public async Task<IBrowserContext> NewContextAsync(BrowserNewContextOptions options = default)
    {
        var args = new Dictionary<string, object>
        {
            ["acceptDownloads"] = options?.AcceptDownloads,
            ["locale"] = options?.Locale,
        };

        var context = await SendMessageToServerAsync<BrowserContext>("newContext", args).ConfigureAwait(false);
        return context;
    }

    public async Task<IPage> NewPageAsync(BrowserNewPageOptions options = default)
    {
        var contextOptions = new BrowserNewContextOptions()
        {
            AcceptDownloads = options?.AcceptDownloads,
            Locale = options?.Locale,
        };

        var context = (BrowserContext)await NewContextAsync(contextOptions).ConfigureAwait(false);
        return await context.NewPageAsync().ConfigureAwait(false);
    }
}
"#;

pub const BROWSER_TYPE: &str = r#"namespace Microsoft.Playwright.Core;

internal class BrowserType : ChannelOwner, IBrowserType
{
    public async Task<IBrowser> LaunchAsync(BrowserTypeLaunchOptions options = default)
    {
        var args = new Dictionary<string, object>
        {
            ["channel"] = options?.Channel,
            ["headless"] = options?.Headless,
        };
        return await SendMessageToServerAsync<Browser>("launch", args).ConfigureAwait(false);
    }

    public async Task<IBrowserContext> LaunchPersistentContextAsync(string userDataDir, BrowserTypeLaunchPersistentContextOptions options = default)
    {
        var channelArgs = new Dictionary<string, object>
        {
            ["userDataDir"] = userDataDir,
            ["headless"] = options?.Headless,
        };
        return await SendMessageToServerAsync<BrowserContext>("launchPersistentContext", channelArgs).ConfigureAwait(false);
    }
}
"#;

pub const OPTION_CLASSES: [&str; 4] = [
    "BrowserTypeLaunchPersistentContextOptions",
    "BrowserTypeLaunchOptions",
    "BrowserNewPageOptions",
    "BrowserNewContextOptions",
];

/// A generated options class with a copy constructor.
pub fn options_class(name: &str) -> String {
    format!(
        r#"#nullable enable

using System.Text.Json.Serialization;

namespace Microsoft.Playwright;

public class {name}
{{
    public {name}() {{ }}

    public {name}({name} clone)
    {{
        if (clone == null)
        {{
            return;
        }}

        Headless = clone.Headless;
        Locale = clone.Locale;
    }}

    /// <summary><para>Whether to run browser in headless mode.</para></summary>
    [JsonPropertyName("headless")]
    public bool? Headless {{ get; set; }}

    [JsonPropertyName("locale")]
    public string? Locale {{ get; set; }}
}}

#nullable disable
"#
    )
}

pub fn crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Write `text` under `root` with CRLF line endings.
pub fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, crlf(text)).unwrap();
}

pub fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

pub const FILES: &[(&str, &str)] = &[
    ("src/Playwright/Playwright.csproj", PLAYWRIGHT_CSPROJ),
    ("src/Playwright.Tests/Playwright.Tests.csproj", TESTS_CSPROJ),
    ("src/Playwright/build/Microsoft.Playwright.targets", TARGETS),
    ("src/Common/Version.props", VERSION_PROPS),
    ("src/tools/Playwright.Tooling/DriverDownloader.cs", DRIVER_DOWNLOADER),
    ("src/Playwright/Core/ScriptsHelper.cs", SCRIPTS_HELPER),
    ("src/Playwright/Core/Worker.cs", WORKER),
    ("src/Playwright/API/Generated/IWorker.cs", IWORKER),
    ("src/Playwright/Core/JSHandle.cs", JSHANDLE),
    ("src/Playwright/API/Generated/IJSHandle.cs", IJSHANDLE),
    ("src/Playwright/API/Supplements/IJSHandle.cs", IJSHANDLE_SUPPLEMENTS),
    ("src/Playwright/Core/Frame.cs", FRAME),
    ("src/Playwright/API/Generated/IFrame.cs", IFRAME),
    ("src/Playwright/API/Supplements/IFrame.cs", IFRAME_SUPPLEMENTS),
    ("src/Playwright/Core/Locator.cs", LOCATOR),
    ("src/Playwright/API/Generated/ILocator.cs", ILOCATOR),
    ("src/Playwright/API/Supplements/ILocator.cs", ILOCATOR_SUPPLEMENTS),
    ("src/Playwright/Core/Page.cs", PAGE),
    ("src/Playwright/API/Generated/IPage.cs", IPAGE),
    ("src/Playwright/API/Supplements/IPage.cs", IPAGE_SUPPLEMENTS),
    ("src/Playwright/Core/BrowserContext.cs", BROWSER_CONTEXT),
    ("src/Playwright/Core/Clock.cs", CLOCK),
    ("src/Playwright/Core/Tracing.cs", TRACING),
    ("src/Playwright/Core/Browser.cs", BROWSER),
    ("src/Playwright/Core/BrowserType.cs", BROWSER_TYPE),
];

/// Every file the built-in plan touches, plus a stale build-output
/// manifest that must never be edited.
pub fn playwright_checkout() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for (relative, text) in FILES {
        write(root, relative, text);
    }
    for name in OPTION_CLASSES {
        write(
            root,
            &format!("src/Playwright/API/Generated/Options/{name}.cs"),
            &options_class(name),
        );
    }
    write(root, "src/Playwright/obj/Debug/Stale.csproj", PLAYWRIGHT_CSPROJ);
    dir
}

/// Snapshot of every file under `root`, relative path to contents.
pub fn snapshot(root: &Path) -> Vec<(String, String)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            (relative, fs::read_to_string(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}
