//! Correlation tokens carried in hidden message links.
//!
//! Button payloads are too short for a request ID plus its subject, so the
//! subject travels as an invisible link at the start of the message body:
//! `tg://btn/1/<tag>/<id>/...`. The fan-out sender embeds it, the router
//! reads it back from the pressed message.

use url::Url;

const SCHEME: &str = "tg";
const HOST: &str = "btn";
const VERSION: &str = "1";

/// Zero-width space: the visible text of the hidden link.
const INVISIBLE: char = '\u{200b}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationToken {
    /// A join request of `publisher_id`, resolved through `request_id`.
    Join { publisher_id: String, request_id: String },
    /// `publisher_id` asks for `territory_id`.
    Take {
        publisher_id: String,
        territory_id: String,
        request_id: String,
    },
    /// Prompt for a note on `territory_id`; the reply carries no request.
    Note { territory_id: String },
}

impl CorrelationToken {
    pub fn to_url(&self) -> String {
        let path = match self {
            CorrelationToken::Join {
                publisher_id,
                request_id,
            } => format!("j/{publisher_id}/{request_id}"),
            CorrelationToken::Take {
                publisher_id,
                territory_id,
                request_id,
            } => format!("t/{publisher_id}/{territory_id}/{request_id}"),
            CorrelationToken::Note { territory_id } => format!("n/{territory_id}"),
        };
        format!("{SCHEME}://{HOST}/{VERSION}/{path}")
    }

    pub fn parse(link: &str) -> Option<Self> {
        let url = Url::parse(link).ok()?;
        if url.scheme() != SCHEME || url.host_str() != Some(HOST) {
            return None;
        }
        let segments: Vec<&str> = url.path_segments()?.collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        match segments.as_slice() {
            [VERSION, "j", publisher_id, request_id] => Some(CorrelationToken::Join {
                publisher_id: publisher_id.to_string(),
                request_id: request_id.to_string(),
            }),
            [VERSION, "t", publisher_id, territory_id, request_id] => Some(CorrelationToken::Take {
                publisher_id: publisher_id.to_string(),
                territory_id: territory_id.to_string(),
                request_id: request_id.to_string(),
            }),
            [VERSION, "n", territory_id] => Some(CorrelationToken::Note {
                territory_id: territory_id.to_string(),
            }),
            _ => None,
        }
    }

    /// Prefixes an HTML body with the invisible link.
    pub fn embed(&self, body: &str) -> String {
        format!("<a href=\"{}\">{}</a>{}", self.to_url(), INVISIBLE, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn take_token_keeps_field_order() {
        let token = CorrelationToken::Take {
            publisher_id: "p".into(),
            territory_id: "t".into(),
            request_id: "r".into(),
        };
        assert_eq!(token.to_url(), "tg://btn/1/t/p/t/r");
        assert_eq!(CorrelationToken::parse("tg://btn/1/t/p/t/r"), Some(token));
    }

    #[test]
    fn note_token_carries_only_territory() {
        let token = CorrelationToken::parse("tg://btn/1/n/abc").unwrap();
        assert_eq!(
            token,
            CorrelationToken::Note {
                territory_id: "abc".into()
            }
        );
    }

    #[test]
    fn rejects_foreign_links() {
        assert_eq!(CorrelationToken::parse("https://btn/1/n/abc"), None);
        assert_eq!(CorrelationToken::parse("tg://user?id=5"), None);
        assert_eq!(CorrelationToken::parse("tg://btn/2/n/abc"), None);
        assert_eq!(CorrelationToken::parse("tg://btn/1/j/only-one"), None);
        assert_eq!(CorrelationToken::parse("tg://btn/1/n//"), None);
        assert_eq!(CorrelationToken::parse("not a url"), None);
    }

    #[test]
    fn embed_hides_link_before_body() {
        let token = CorrelationToken::Note {
            territory_id: "t1".into(),
        };
        assert_eq!(token.embed("hi"), "<a href=\"tg://btn/1/n/t1\">\u{200b}</a>hi");
    }
}
