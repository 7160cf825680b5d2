//! Mapping from decision outcome to pipeline action.
//!
//! Fail-open: only an explicit block verdict stops a request. Every
//! inconclusive outcome continues as if no inspection took place.

use http::StatusCode;

use super::decision::DecisionOutcome;
use crate::response::Response;

const DENY_PAGE: &str = include_str!("deny.html");
const PLACEHOLDER: &str = "{{request_id}}";

/// What the middleware does with the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnforcementAction {
    /// Hand the request, untouched, to the next stage.
    Continue,
    /// Answer with the denial page. An empty id means the service sent none.
    Deny { request_id: String },
}

pub fn enforce(outcome: &DecisionOutcome) -> EnforcementAction {
    match outcome {
        DecisionOutcome::Verdict(verdict) if verdict.is_block() => EnforcementAction::Deny {
            request_id: verdict.request_id.clone().unwrap_or_default(),
        },
        DecisionOutcome::Verdict(_) | DecisionOutcome::Inconclusive(_) => EnforcementAction::Continue,
    }
}

/// `403 Forbidden` with the static denial page.
///
/// The id comes from a remote service, so it is HTML-escaped before it
/// replaces the single placeholder.
pub fn deny_response(request_id: &str) -> Response {
    let page = DENY_PAGE.replacen(PLACEHOLDER, &escape_html(request_id), 1);
    Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header("cache-control", "no-store")
        .html(page)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::decision::{Action, InconclusiveReason, Verdict};

    fn verdict(action: Action, id: Option<&str>) -> DecisionOutcome {
        DecisionOutcome::Verdict(Verdict { action, request_id: id.map(str::to_owned) })
    }

    #[test]
    fn block_denies_with_id() {
        assert_eq!(
            enforce(&verdict(Action::Block, Some("abc123"))),
            EnforcementAction::Deny { request_id: "abc123".into() }
        );
        assert_eq!(
            enforce(&verdict(Action::Block, None)),
            EnforcementAction::Deny { request_id: String::new() }
        );
    }

    #[test]
    fn everything_else_continues() {
        let outcomes = [
            verdict(Action::Allow, Some("abc")),
            verdict(Action::Other("quarantine".into()), None),
            verdict(Action::Missing, None),
            DecisionOutcome::Inconclusive(InconclusiveReason::Timeout),
            DecisionOutcome::Inconclusive(InconclusiveReason::NetworkError),
            DecisionOutcome::Inconclusive(InconclusiveReason::NonSuccessStatus(StatusCode::BAD_GATEWAY)),
            DecisionOutcome::Inconclusive(InconclusiveReason::MalformedResponse),
        ];
        for outcome in &outcomes {
            assert_eq!(enforce(outcome), EnforcementAction::Continue, "{outcome:?}");
        }
    }

    #[test]
    fn denial_page() {
        let res = deny_response("abc123");
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
        let body = std::str::from_utf8(res.body()).unwrap();
        assert!(body.contains("Your request was blocked"));
        assert!(body.contains("<code>abc123</code>"));
        assert!(!body.contains(PLACEHOLDER));
    }

    #[test]
    fn denial_page_escapes_id() {
        let res = deny_response("<script>x</script>");
        let body = std::str::from_utf8(res.body()).unwrap();
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;x&lt;/script&gt;"));
    }

    #[test]
    fn denial_page_is_constant_apart_from_id() {
        let a = String::from_utf8(deny_response("a").body().to_vec()).unwrap();
        let b = String::from_utf8(deny_response("b").body().to_vec()).unwrap();
        assert_eq!(a.replacen("<code>a</code>", "", 1), b.replacen("<code>b</code>", "", 1));
    }
}
