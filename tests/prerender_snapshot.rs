use texbake::application::{
    client::ClientNeutralizer,
    prerender::Prerenderer,
    render::{MathMode, TypesetError},
};

fn tag(expression: &str, mode: MathMode) -> Result<String, TypesetError> {
    Ok(format!("<m-{mode}>{expression}</m-{mode}>"))
}

const PAGE: &str = r#"<html><head>
<script defer src="/katex/contrib/auto-render.min.js"></script>
<script>document.addEventListener("DOMContentLoaded", function () { renderMathInElement(document.body); });</script>
</head><body>
<p>Euler: $e^{i\pi} + 1 = 0$.</p>
\[\int_0^1 x\,dx\]
<p>Costs $5 and $$ stays.</p>
</body></html>"#;

#[test]
fn page_with_auto_render_is_prerendered() {
    let prerenderer = Prerenderer::new(tag, Some(ClientNeutralizer::default()));
    let output = prerenderer.prerender(PAGE).expect("prerender succeeds");

    assert_eq!(output.tally.succeeded, 2);
    assert_eq!(output.tally.failed, 0);
    assert_eq!(output.client.scripts_removed, 1);
    assert_eq!(output.client.calls_voided, 1);
    insta::assert_snapshot!(output.html, @r#"
<html><head>

<script>document.addEventListener("DOMContentLoaded", function () { void (document.body); });</script>
</head><body>
<p>Euler: <m-inline>e^{i\pi} + 1 = 0</m-inline>.</p>
<m-display>\int_0^1 x\,dx</m-display>
<p>Costs $5 and $$ stays.</p>
</body></html>
"#);
}

#[test]
fn rejected_expressions_keep_their_delimiters() {
    let reject = |_: &str, _: MathMode| -> Result<String, TypesetError> {
        Err(TypesetError::new("unsupported"))
    };
    let prerenderer = Prerenderer::new(reject, None);
    let page = "<p>\\[ a \\] and $ b $</p>";

    let output = prerenderer.prerender(page).expect("prerender succeeds");

    assert_eq!(output.html, page);
    assert_eq!(output.tally.failed, 2);
}
