//! Message copy.
//!
//! Pure functions from structured inputs to HTML strings. Everything a user
//! typed (names, titles, notes) is escaped here and nowhere else.

use chrono::{DateTime, Utc};
use fluent_templates::fluent_bundle::FluentArgs;
use unic_langid::LanguageIdentifier;

use crate::core::config::limits;
use crate::domain::{Territory, TerritoryNote};
use crate::i18n;

/// Escapes text for Telegram HTML parse mode.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Length as Telegram measures captions (UTF-16 units). Markup is counted
/// too, so the result never undercounts.
pub fn caption_len(text: &str) -> usize {
    text.encode_utf16().count()
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d.%m.%Y").to_string()
}

/// Looks up `key` with the given arguments. Values are escaped.
fn fill(lang: &LanguageIdentifier, key: &str, values: &[(&str, &str)]) -> String {
    let mut args = FluentArgs::new();
    for (name, value) in values {
        args.set(*name, escape(value));
    }
    i18n::t_args(lang, key, &args)
}

pub fn plain(lang: &LanguageIdentifier, key: &str) -> String {
    i18n::t(lang, key)
}

/// Inline button label of a group: `"<group> (<count>)"`.
pub fn group_label(title: &str, count: usize) -> String {
    format!("{} ({})", title, count)
}

/// What a territory message shows to its viewer.
#[derive(Debug, Clone, Copy)]
pub struct CaptionView<'a> {
    pub territory: &'a Territory,
    pub group_title: &'a str,
    /// Shown when set (admin views).
    pub holder_name: Option<&'a str>,
    pub notes: &'a [TerritoryNote],
}

pub fn territory_caption(lang: &LanguageIdentifier, view: &CaptionView<'_>) -> String {
    let mut lines = vec![fill(
        lang,
        "territory-caption-title",
        &[("title", &view.territory.title), ("group", view.group_title)],
    )];

    match view.territory.last_taken_at {
        Some(at) => lines.push(fill(lang, "territory-last-worked", &[("date", &format_date(at))])),
        None => lines.push(plain(lang, "territory-never-worked")),
    }

    if let Some(name) = view.holder_name {
        lines.push(fill(lang, "territory-holder", &[("name", name)]));
    }

    with_notes(lang, lines.join("\n"), view.notes)
}

/// Appends the notes block to `head`, keeping the whole caption within
/// [`limits::CAPTION_MAX_LEN`].
fn with_notes(lang: &LanguageIdentifier, head: String, notes: &[TerritoryNote]) -> String {
    let budget = limits::CAPTION_MAX_LEN.saturating_sub(caption_len(&head) + 2);
    let notes = notes_block(lang, notes, budget);
    if notes.is_empty() {
        head
    } else {
        format!("{}\n\n{}", head, notes)
    }
}

/// Header plus one `📌 text` line per note, at most `budget` long; empty
/// when there are no notes or not even the header fits.
///
/// When the notes do not fit, the newest ones are kept and the older ones
/// are summarized in a single "N earlier notes" line.
pub fn notes_block(lang: &LanguageIdentifier, notes: &[TerritoryNote], budget: usize) -> String {
    if notes.is_empty() {
        return String::new();
    }
    let header = plain(lang, "territory-notes-header");
    let lines: Vec<String> = notes
        .iter()
        .map(|note| format!("📌 {}", escape(&note.text)))
        .collect();

    let full_len = caption_len(&header) + lines.iter().map(|line| caption_len(line) + 1).sum::<usize>();
    if full_len <= budget {
        let mut block = vec![header];
        block.extend(lines);
        return block.join("\n");
    }

    // Room for the summary line with the largest count it could show
    let reserved = caption_len(&more_notes(lang, notes.len())) + 1;
    let mut used = caption_len(&header) + reserved;
    if used > budget {
        return String::new();
    }
    let mut kept = 0;
    for line in lines.iter().rev() {
        let len = caption_len(line) + 1;
        if used + len > budget {
            break;
        }
        used += len;
        kept += 1;
    }

    let mut block = vec![header, more_notes(lang, notes.len() - kept)];
    block.extend(lines[lines.len() - kept..].iter().cloned());
    block.join("\n")
}

fn more_notes(lang: &LanguageIdentifier, count: usize) -> String {
    fill(lang, "territory-notes-more", &[("count", &count.to_string())])
}

pub fn territory_added(lang: &LanguageIdentifier, title: &str, group: &str) -> String {
    fill(lang, "territory-added", &[("title", title), ("group", group)])
}

pub fn join_request(lang: &LanguageIdentifier, name: &str, congregation: &str) -> String {
    fill(lang, "join-admin-request", &[("name", name), ("congregation", congregation)])
}

pub fn join_approved_notice(lang: &LanguageIdentifier, congregation: &str) -> String {
    fill(lang, "join-approved-notice", &[("congregation", congregation)])
}

/// Final text of every admin copy of a join request.
pub fn join_outcome(lang: &LanguageIdentifier, approved: bool, name: &str, admin: &str) -> String {
    let key = if approved {
        "join-admin-approved"
    } else {
        "join-admin-rejected"
    };
    fill(lang, key, &[("name", name), ("admin", admin)])
}

pub fn take_request(lang: &LanguageIdentifier, name: &str, title: &str, group: &str) -> String {
    fill(lang, "take-admin-request", &[("name", name), ("title", title), ("group", group)])
}

pub fn take_request_sent(lang: &LanguageIdentifier, title: &str) -> String {
    fill(lang, "take-request-sent", &[("title", title)])
}

/// How a take request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeOutcome {
    Approved,
    Rejected,
    /// Approved, but someone else got the territory first.
    Unavailable,
}

/// Final caption of every admin copy of a take request.
pub fn take_outcome(lang: &LanguageIdentifier, outcome: TakeOutcome, name: &str, title: &str, admin: &str) -> String {
    match outcome {
        TakeOutcome::Approved => fill(
            lang,
            "take-admin-approved",
            &[("name", name), ("title", title), ("admin", admin)],
        ),
        TakeOutcome::Rejected => fill(
            lang,
            "take-admin-rejected",
            &[("name", name), ("title", title), ("admin", admin)],
        ),
        TakeOutcome::Unavailable => fill(lang, "take-admin-unavailable", &[("title", title)]),
    }
}

/// What the publisher hears about their take request.
pub fn take_notice(lang: &LanguageIdentifier, approved: bool, title: &str, notes: &[TerritoryNote]) -> String {
    if !approved {
        return fill(lang, "take-rejected-notice", &[("title", title)]);
    }
    with_notes(lang, fill(lang, "take-approved-notice", &[("title", title)]), notes)
}

pub fn returned(lang: &LanguageIdentifier, title: &str) -> String {
    fill(lang, "return-done", &[("title", title)])
}

pub fn returned_admin_notice(lang: &LanguageIdentifier, name: &str, title: &str) -> String {
    fill(lang, "return-admin-notice", &[("name", name), ("title", title)])
}

pub fn note_prompt(lang: &LanguageIdentifier, title: &str) -> String {
    fill(lang, "note-prompt", &[("title", title)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileKind;
    use crate::i18n::lang_from_code;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn en() -> LanguageIdentifier {
        lang_from_code("en")
    }

    #[test]
    fn escape_covers_html_specials() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
        assert_eq!(escape("Львів"), "Львів");
    }

    #[test]
    fn caption_for_publisher_hides_holder() {
        let territory = Territory::new("c", "g", "123-a", "f", FileKind::Photo);
        let caption = territory_caption(
            &en(),
            &CaptionView {
                territory: &territory,
                group_title: "Lviv",
                holder_name: None,
                notes: &[],
            },
        );
        assert_eq!(caption, "🗺 <b>123-a</b> (Lviv)\nNever worked");
    }

    #[test]
    fn caption_for_admin_shows_holder_date_and_notes() {
        let mut territory = Territory::new("c", "g", "7", "f", FileKind::Document);
        territory.last_taken_at = Some(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap());
        let notes = vec![
            TerritoryNote::new(&territory.id, "u", "dog <at> gate"),
            TerritoryNote::new(&territory.id, "u", "code 12"),
        ];
        let caption = territory_caption(
            &en(),
            &CaptionView {
                territory: &territory,
                group_title: "Center",
                holder_name: Some("Ann & Bob"),
                notes: &notes,
            },
        );
        assert_eq!(
            caption,
            "🗺 <b>7</b> (Center)\nLast worked: 05.03.2024\nCurrently with: Ann &amp; Bob\n\n\
             Notes:\n📌 dog &lt;at&gt; gate\n📌 code 12"
        );
    }

    fn long_notes(territory: &Territory, count: usize, len: usize) -> Vec<TerritoryNote> {
        (0..count)
            .map(|i| TerritoryNote::new(&territory.id, "u", format!("{}{}", i, "x".repeat(len))))
            .collect()
    }

    #[test]
    fn caption_keeps_newest_notes_within_the_limit() {
        let territory = Territory::new("c", "g", "7", "f", FileKind::Photo);
        let notes = long_notes(&territory, 5, 300);
        let caption = territory_caption(
            &en(),
            &CaptionView {
                territory: &territory,
                group_title: "Center",
                holder_name: None,
                notes: &notes,
            },
        );

        assert!(caption_len(&caption) <= limits::CAPTION_MAX_LEN);
        assert!(caption.contains("📌 4x"));
        assert!(caption.contains("📌 3x"));
        assert!(!caption.contains("📌 0x"));
        assert!(caption.contains("earlier notes not shown"));
    }

    #[test]
    fn take_notice_with_many_notes_fits_a_caption() {
        let territory = Territory::new("c", "g", "7", "f", FileKind::Photo);
        let notes = long_notes(&territory, 40, 290);
        let notice = take_notice(&en(), true, "7", &notes);

        assert!(caption_len(&notice) <= limits::CAPTION_MAX_LEN);
        assert!(notice.contains("📌 39x"));
    }

    #[test]
    fn notes_block_is_empty_without_room() {
        let territory = Territory::new("c", "g", "7", "f", FileKind::Photo);
        let notes = long_notes(&territory, 2, 10);
        assert_eq!(notes_block(&en(), &notes, 5), "");
        assert!(notes_block(&en(), &notes, 1000).ends_with("📌 1xxxxxxxxxx"));
    }

    #[test]
    fn take_outcomes_name_the_admin() {
        let text = take_outcome(&en(), TakeOutcome::Approved, "Ann", "7", "Mark");
        assert_eq!(text, "✅ <b>7</b> given to Ann. Approved by: Mark");
        let unavailable = take_outcome(&en(), TakeOutcome::Unavailable, "Ann", "7", "Mark");
        assert_eq!(unavailable, "⚠️ Territory <b>7</b> is no longer available.");
    }

    #[test]
    fn group_label_counts() {
        assert_eq!(group_label("Lviv", 3), "Lviv (3)");
    }
}
