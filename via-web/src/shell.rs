//! Assembles the outer HTML document wrapping every initial page render
//! (spec.md §6 "Shell"): a fixed skeleton carrying the script tag that loads
//! the client runtime, a meta tag seeding the initial signals snapshot
//! (must include `via_ctx`), the SSE auto-connect hint, the developer's
//! registered head/foot fragments, and the `beforeunload` beacon that hits
//! `/_session/close` -- the one piece of client-visible JS this crate emits
//! itself rather than delegating to the bundled runtime script.

use via_core::Context;

pub const DATASTAR_SCRIPT_PATH: &str = "/_datastar.js";
pub const SESSION_CLOSE_PATH: &str = "/_session/close";
pub const SSE_PATH: &str = "/_sse";

pub fn render_shell(ctx: &Context, rendered_view: &str, head_fragments: &str, foot_fragments: &str) -> String {
    let ctx_id = ctx.id();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="via:signals" content='{{"via_ctx":"{ctx_id}"}}'>
<meta name="via:sse" content="GET {SSE_PATH}">
<script type="module" src="{DATASTAR_SCRIPT_PATH}"></script>
{head_fragments}
</head>
<body data-via-ctx="{ctx_id}">
{rendered_view}
<script>
window.addEventListener("beforeunload", function () {{
  navigator.sendBeacon("{SESSION_CLOSE_PATH}", "{ctx_id}");
}});
</script>
{foot_fragments}
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use via_core::Application;

    #[test]
    fn shell_embeds_context_id_and_view_and_fragments() {
        let app = Arc::new(Application::new());
        let ctx = Context::create(app, "/home", HashMap::new(), "sess-1".to_string());
        let html = render_shell(&ctx, "<h1>hi</h1>", "<link rel=\"icon\">", "<script src=\"/x.js\"></script>");

        assert!(html.contains(&format!("\"via_ctx\":\"{}\"", ctx.id())));
        assert!(html.contains(&format!("data-via-ctx=\"{}\"", ctx.id())));
        assert!(html.contains("<h1>hi</h1>"));
        assert!(html.contains(SSE_PATH));
        assert!(html.contains(DATASTAR_SCRIPT_PATH));
        assert!(html.contains(SESSION_CLOSE_PATH));
        assert!(html.contains("<link rel=\"icon\">"));
        assert!(html.contains("<script src=\"/x.js\"></script>"));
    }
}
