use std::{fs, path::PathBuf};

use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.katex.output, MarkupOutput::Html);
    assert!(settings.katex.trust);
    assert!(!settings.katex.throw_on_error);
    assert!(settings.client.enabled);
    assert_eq!(settings.client.script_markers, ["katex", "auto-render"]);
    assert_eq!(settings.client.render_functions, ["renderMathInElement"]);
    assert_eq!(settings.documents.extensions, ["html", "htm"]);
    assert!(!settings.run.fail_on_error);
    assert!(!settings.run.json_summary);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.katex.trust = Some(true);
    raw.run.fail_on_error = Some(false);

    let overrides = RunOverrides {
        log_level: Some("debug".to_string()),
        katex_trust: Some(false),
        fail_on_error: Some(true),
        ..Default::default()
    };

    raw.apply_run_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(!settings.katex.trust);
    assert!(settings.run.fail_on_error);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = RunOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_run_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn keep_client_scripts_disables_neutralization() {
    let mut raw = RawSettings::default();
    raw.client.enabled = Some(true);
    let overrides = RunOverrides {
        keep_client_scripts: true,
        ..Default::default()
    };

    raw.apply_run_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(!settings.client.enabled);
}

#[test]
fn invalid_log_level_is_reported_with_its_key() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn unknown_katex_output_is_rejected() {
    let mut raw = RawSettings::default();
    raw.katex.output = Some("svg".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid output");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "katex.output",
            ..
        }
    ));
}

#[test]
fn macro_names_gain_a_leading_backslash() {
    let mut raw = RawSettings::default();
    raw.katex.macros = vec![
        RawMacro {
            name: "RR".to_string(),
            expansion: "\\mathbb{R}".to_string(),
        },
        RawMacro {
            name: "\\NN".to_string(),
            expansion: "\\mathbb{N}".to_string(),
        },
    ];

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.katex.macros.get("\\RR").map(String::as_str),
        Some("\\mathbb{R}")
    );
    assert_eq!(
        settings.katex.macros.get("\\NN").map(String::as_str),
        Some("\\mathbb{N}")
    );
}

#[test]
fn blank_macro_name_is_rejected() {
    let mut raw = RawSettings::default();
    raw.katex.macros = vec![RawMacro {
        name: "\\".to_string(),
        expansion: "x".to_string(),
    }];

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "katex.macros",
            ..
        })
    ));
}

#[test]
fn extensions_are_normalized_and_must_not_be_empty() {
    let mut raw = RawSettings::default();
    raw.documents.extensions = Some(vec![".xhtml".to_string(), " html ".to_string()]);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.documents.extensions, ["xhtml", "html"]);

    let mut raw = RawSettings::default();
    raw.documents.extensions = Some(vec![" ".to_string()]);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "documents.extensions",
            ..
        })
    ));
}

#[test]
fn enabled_client_needs_something_to_match() {
    let mut raw = RawSettings::default();
    raw.client.script_markers = Some(Vec::new());
    raw.client.render_functions = Some(vec![String::new()]);
    assert!(Settings::from_raw(raw.clone()).is_err());

    raw.client.enabled = Some(false);
    let settings = Settings::from_raw(raw).expect("disabled client accepts empty lists");
    assert!(settings.client.script_markers.is_empty());
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "texbake",
        "render",
        "--out-dir",
        "public",
        "--fail-on-error",
        "--katex-output",
        "html_and_mathml",
        "site",
        "extra.html",
    ]);

    match args.command {
        Command::Render(render) => {
            assert_eq!(
                render.inputs,
                vec![PathBuf::from("site"), PathBuf::from("extra.html")]
            );
            assert_eq!(render.out_dir, Some(PathBuf::from("public")));
            assert!(render.output.is_none());
            assert_eq!(render.overrides.fail_on_error, Some(true));
            assert_eq!(
                render.overrides.katex_output.as_deref(),
                Some("html_and_mathml")
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_check_arguments() {
    let args = CliArgs::parse_from(["texbake", "check", "--json", "page.html"]);

    match args.command {
        Command::Check(check) => {
            assert_eq!(check.inputs, vec![PathBuf::from("page.html")]);
            assert!(check.overrides.json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn fail_on_error_flag_does_not_swallow_the_input() {
    let args = CliArgs::try_parse_from(["texbake", "render", "--fail-on-error", "page.html"])
        .expect("flag before input parses");

    match args.command {
        Command::Render(render) => {
            assert_eq!(render.overrides.fail_on_error, Some(true));
            assert_eq!(render.inputs, vec![PathBuf::from("page.html")]);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let args = CliArgs::try_parse_from(["texbake", "check", "--fail-on-error=false", "page.html"])
        .expect("explicit value parses");
    assert_eq!(args.command.overrides().fail_on_error, Some(false));
}

#[test]
fn output_and_out_dir_conflict() {
    let result = CliArgs::try_parse_from([
        "texbake",
        "render",
        "--output",
        "a.html",
        "--out-dir",
        "public",
        "page.html",
    ]);
    assert!(result.is_err());
}

#[test]
fn inputs_are_required() {
    assert!(CliArgs::try_parse_from(["texbake", "check"]).is_err());
}

#[test]
fn config_file_layers_under_cli_overrides() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("texbake.toml");
    fs::write(
        &path,
        r#"
[katex]
output = "mathml"
trust = false

[[katex.macros]]
name = "\\RR"
expansion = "\\mathbb{R}"

[client]
script_markers = ["mathjax"]

[run]
fail_on_error = true
"#,
    )
    .expect("write config");

    let config_arg = path.to_string_lossy().into_owned();
    let args = CliArgs::parse_from([
        "texbake",
        "--config-file",
        config_arg.as_str(),
        "check",
        "--katex-trust",
        "true",
        "page.html",
    ]);

    let settings = load(&args).expect("settings");

    assert_eq!(settings.katex.output, MarkupOutput::Mathml);
    assert!(settings.katex.trust);
    assert!(settings.katex.macros.contains_key("\\RR"));
    assert_eq!(settings.client.script_markers, ["mathjax"]);
    assert!(settings.run.fail_on_error);
}
