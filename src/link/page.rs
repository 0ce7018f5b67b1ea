//! HTML pages that host the Plaid Link widget.

use crate::provider::LinkToken;

use super::FlowKind;

const LINK_SCRIPT: &str = r#"
      const handler = Plaid.create({
        token: __TOKEN__,
        onSuccess: (public_token, metadata) => {
          post({ public_token: public_token }).then(done);
        },
        onExit: (err, metadata) => {
          const reason = err ? describe(err) : "Link was closed before an institution was linked";
          post({ public_token: "", error: reason });
        },
      });
      handler.open();
"#;

// Update mode keeps the existing access token, so success carries no payload.
const RELINK_SCRIPT: &str = r#"
      let finished = false;
      const handler = Plaid.create({
        token: __TOKEN__,
        onSuccess: (public_token, metadata) => {
          finished = true;
          post({ error: "" }).then(done);
        },
        onExit: (err, metadata) => {
          if (finished) {
            return;
          }
          post({ error: err ? describe(err) : "" }).then(done);
        },
      });
      handler.open();
"#;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>plaid-cli</title>
    <style>
    .alert-success {
      font-size: 1.2em;
      font-family: Arial, Helvetica, sans-serif;
      background-color: #008000;
      color: #fff;
      display: flex;
      justify-content: center;
      align-items: center;
      border-radius: 15px;
      width: 100%;
      height: 100%;
    }
    .hidden {
      visibility: hidden;
    }
    </style>
  </head>
  <body>
    <script src="https://cdn.plaid.com/link/v2/stable/link-initialize.js"></script>
    <script type="text/javascript">
      const post = (fields) =>
        fetch(__PATH__, { method: "POST", body: new URLSearchParams(fields) });
      const describe = (err) =>
        [err.error_code, err.error_message].filter(Boolean).join(": ") || "unknown error";
      const done = () => document.getElementById("alert").classList.remove("hidden");
__SCRIPT__
    </script>

    <div id="alert" class="alert-success hidden">
      <div>
        <h2>All done here!</h2>
        <p>You can close this window and go back to plaid-cli.</p>
      </div>
    </div>
  </body>
</html>
"#;

/// Render the widget page for `flow`, configured with `token`.
pub fn render(flow: FlowKind, token: &LinkToken) -> String {
    let script = match flow {
        FlowKind::Link => LINK_SCRIPT,
        FlowKind::Relink => RELINK_SCRIPT,
    };
    PAGE.replace("__SCRIPT__", script)
        .replace("__PATH__", &js_string(flow.path()))
        .replace("__TOKEN__", &js_string(token.as_str()))
}

/// Quote `value` as a JavaScript string literal that is safe inside `<script>`.
fn js_string(value: &str) -> String {
    // A JSON string is a valid JS string literal; serializing a &str cannot fail.
    let quoted = serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""));
    quoted
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
