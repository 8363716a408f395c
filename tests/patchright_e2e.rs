//! The built-in Patchright plan against a trimmed playwright-dotnet tree.

mod common;

use common::{playwright_checkout, read, snapshot, OPTION_CLASSES};
use cs_patcher::plan::{builtin, Mode, Runner, StepOutcome};
use std::path::Path;

fn apply(root: &Path) -> Vec<cs_patcher::StepReport> {
    let plan = builtin().unwrap();
    let mut runner = Runner::new(root, Mode::Apply).unwrap();
    runner.run(&plan).into_result().unwrap()
}

/// Every `\n` is part of a `\r\n`.
fn all_crlf(text: &str) -> bool {
    text.bytes()
        .enumerate()
        .filter(|(_, b)| *b == b'\n')
        .all(|(i, _)| i > 0 && text.as_bytes()[i - 1] == b'\r')
}

#[test]
fn test_builtin_plan_applies_every_step() {
    let dir = playwright_checkout();
    let plan = builtin().unwrap();
    let reports = apply(dir.path());

    assert_eq!(reports.len(), plan.steps.len());
    for report in &reports {
        assert_eq!(report.outcome, StepOutcome::Applied, "step {}", report.step);
    }
}

#[test]
fn test_second_run_changes_nothing() {
    let dir = playwright_checkout();
    apply(dir.path());
    let after_first = snapshot(dir.path());

    let reports = apply(dir.path());
    assert!(reports
        .iter()
        .all(|r| r.outcome == StepOutcome::AlreadyApplied && r.changes.is_empty()));
    assert_eq!(snapshot(dir.path()), after_first);
}

#[test]
fn test_line_endings_survive() {
    let dir = playwright_checkout();
    apply(dir.path());

    for (relative, text) in snapshot(dir.path()) {
        assert!(all_crlf(&text), "{relative} has bare LF line endings");
    }
}

#[test]
fn test_packaging_metadata() {
    let dir = playwright_checkout();
    let root = dir.path();
    apply(root);

    let csproj = read(root, "src/Playwright/Playwright.csproj");
    assert!(csproj.contains("<EnablePackageValidation>false</EnablePackageValidation>"));
    assert!(csproj.contains("<TreatWarningsAsErrors>false</TreatWarningsAsErrors>"));
    assert!(csproj.contains("<PackageId>Patchright</PackageId>"));
    assert!(csproj.contains("<Authors>Microsoft Corporation, patched by Werner van Deventer</Authors>"));
    assert!(csproj.contains("<TargetFramework>netstandard2.0</TargetFramework>"));

    // build output is never walked into
    assert_eq!(
        read(root, "src/Playwright/obj/Debug/Stale.csproj"),
        common::crlf(common::PLAYWRIGHT_CSPROJ)
    );

    let props = read(root, "src/Common/Version.props");
    assert!(props.contains("<Owners>DevEnterprise Software</Owners>"));
    assert!(props.contains("<PackageLicenseExpression>Apache-2.0</PackageLicenseExpression>"));
    assert!(props.contains("<AssemblyVersion>1.49.0</AssemblyVersion>"));

    // the targets file is copied under the new name; the original stays
    assert_eq!(
        read(root, "src/Playwright/build/Microsoft.Playwright.targets"),
        common::crlf(common::TARGETS)
    );
    let targets = read(root, "src/Playwright/build/Patchright.targets");
    assert!(targets.contains("<NuGetPackageId>Patchright</NuGetPackageId>"));

    let downloader = read(root, "src/tools/Playwright.Tooling/DriverDownloader.cs");
    assert!(downloader.contains("\"https://github.com/Kaliiiiiiiiii-Vinyzu/patchright/releases/download\""));
    assert!(downloader.contains("$\"{cdn}/v{driverVersion}/playwright-{driverVersion}-{platform}.zip\""));
}

#[test]
fn test_source_url_is_dropped() {
    let dir = playwright_checkout();
    apply(dir.path());

    let helper = read(dir.path(), "src/Playwright/Core/ScriptsHelper.cs");
    assert!(helper.contains(
        "internal static string AddSourceUrlToScript(string source, string path)\r\n    {\r\n        return source;\r\n    }\r\n"
    ));
    assert!(!helper.contains("sourceURL"));
    assert!(helper.contains("return AddSourceUrlToScript(File.ReadAllText(path), path);"));
}

#[test]
fn test_isolated_context_is_threaded_through() {
    let dir = playwright_checkout();
    let root = dir.path();
    apply(root);

    let worker = read(root, "src/Playwright/Core/Worker.cs");
    assert_eq!(worker.matches("object arg = null, bool isolatedContext = true)").count(), 2);
    assert_eq!(
        worker
            .matches("                [\"isolatedContext\"] = isolatedContext,\r\n            }")
            .count(),
        2
    );

    let iworker = read(root, "src/Playwright/API/Generated/IWorker.cs");
    assert_eq!(iworker.matches("object? arg = default, bool isolatedContext = true);").count(), 2);

    let frame = read(root, "src/Playwright/Core/Frame.cs");
    assert!(frame.contains("_evalOnSelectorAsync(selector, expression, arg, isolatedContext: isolatedContext)"));
    assert!(frame.contains("_evalOnSelectorAllAsync(selector, expression, arg, isolatedContext: isolatedContext)"));
    assert!(frame.contains("object args = null, bool? strict = null, bool isolatedContext = true)"));
    assert_eq!(frame.matches("[\"isolatedContext\"] = isolatedContext,").count(), 4);

    let locator = read(root, "src/Playwright/Core/Locator.cs");
    assert!(locator.contains("LocatorEvaluateOptions options = null, bool isolatedContext = true)"));
    assert!(locator.contains("e.EvaluateHandleAsync(expression, arg, isolatedContext: isolatedContext)"));
    assert!(locator.contains("_frame.EvalOnSelectorAllAsync<T>(_selector, expression, arg, isolatedContext: isolatedContext)"));

    let page = read(root, "src/Playwright/Core/Page.cs");
    assert_eq!(page.matches("MainFrame.").count(), 4);
    assert_eq!(page.matches(", isolatedContext: isolatedContext)").count(), 4);

    let supplements = read(root, "src/Playwright/API/Supplements/IJSHandle.cs");
    assert!(supplements.contains("<inheritdoc cref=\"EvaluateAsync{T}(string, object, bool)\"/>"));
    assert!(supplements.contains("object arg = null, bool isolatedContext = true);"));

    let ipage = read(root, "src/Playwright/API/Supplements/IPage.cs");
    assert_eq!(ipage.matches("bool isolatedContext = true").count(), 1);
}

#[test]
fn test_init_script_route_injection() {
    let dir = playwright_checkout();
    let root = dir.path();
    apply(root);

    let page = read(root, "src/Playwright/Core/Page.cs");
    assert!(page.contains("\r\n\r\n    public bool RouteInjecting { get; private set; }\r\n"));
    assert!(page.contains("    [MethodImpl(MethodImplOptions.NoInlining)]\r\n    public async Task InstallInjectRouteAsync()\r\n    {\r\n"));
    assert!(page.contains("if (RouteInjecting || Context.RouteInjecting)"));
    assert!(page.contains("patchright-init-script-inject.internal/"));
    assert_eq!(page.matches("await InstallInjectRouteAsync().ConfigureAwait(false);").count(), 2);
    assert!(page.contains(
        "    {\r\n        await InstallInjectRouteAsync().ConfigureAwait(false);\r\n\r\n        if (Bindings.ContainsKey(name))"
    ));
    // the expression-bodied AddInitScriptAsync now awaits its send call
    assert!(page.contains("public async Task AddInitScriptAsync(string script = null, string scriptPath = null)\r\n    {\r\n"));
    assert!(page.contains("await SendMessageToServerAsync(\"addInitScript\""));
    assert!(page.ends_with("        RouteInjecting = true;\r\n    }\r\n}\r\n"));

    let context = read(root, "src/Playwright/Core/BrowserContext.cs");
    assert!(context.contains("        if (RouteInjecting)\r\n"));
    assert!(!context.contains("Context.RouteInjecting"));
    // only the private overload is injected into
    assert!(context.contains(
        "    public Task ExposeBindingAsync(string name, Action callback, BrowserContextExposeBindingOptions options = default)\r\n        => ExposeBindingAsync(name, callback, handle: options?.Handle ?? false);\r\n"
    ));
    assert!(context.contains(
        "    private async Task ExposeBindingAsync(string name, Delegate callback, bool handle = false)\r\n    {\r\n        await InstallInjectRouteAsync().ConfigureAwait(false);\r\n\r\n"
    ));
    assert!(context.contains(
        "    public async Task AddInitScriptAsync(string script = null, string scriptPath = null)\r\n    {\r\n        await InstallInjectRouteAsync().ConfigureAwait(false);\r\n\r\n        if (string.IsNullOrEmpty(script))"
    ));

    let clock = read(root, "src/Playwright/Core/Clock.cs");
    assert!(clock.contains(
        "    {\r\n        await browserContext.InstallInjectRouteAsync().ConfigureAwait(false);\r\n\r\n        var args"
    ));

    let tracing = read(root, "src/Playwright/Core/Tracing.cs");
    assert!(tracing.contains("await ((BrowserContext)Parent!).InstallInjectRouteAsync().ConfigureAwait(false);\r\n\r\n        await SendMessageToServerAsync(\"tracingStart\""));
}

#[test]
fn test_focus_control_option() {
    let dir = playwright_checkout();
    let root = dir.path();
    apply(root);

    for name in OPTION_CLASSES {
        let options = read(root, &format!("src/Playwright/API/Generated/Options/{name}.cs"));
        assert!(
            options.contains("        Locale = clone.Locale;\r\n        FocusControl = clone.FocusControl;\r\n    }\r\n"),
            "{name} copy constructor"
        );
        assert!(
            options.contains("    public string? Locale { get; set; }\r\n\r\n    [JsonPropertyName(\"focusControl\")]\r\n    public bool? FocusControl { get; set; }\r\n}\r\n"),
            "{name} property"
        );
        assert!(options.ends_with("}\r\n\r\n#nullable disable\r\n"));
    }

    let browser = read(root, "src/Playwright/Core/Browser.cs");
    assert!(browser.contains(
        "        {\r\n            [\"focusControl\"] = options.FocusControl,\r\n            [\"acceptDownloads\"] = options?.AcceptDownloads,\r\n"
    ));
    assert!(browser.contains(
        "new BrowserNewContextOptions()\r\n        {\r\n            FocusControl = options.FocusControl,\r\n            AcceptDownloads = options?.AcceptDownloads,\r\n"
    ));

    let browser_type = read(root, "src/Playwright/Core/BrowserType.cs");
    assert_eq!(browser_type.matches("[\"focusControl\"] = options.FocusControl,\r\n").count(), 2);
    assert!(browser_type.contains("[\"focusControl\"] = options.FocusControl,\r\n            [\"userDataDir\"] = userDataDir,"));
}
