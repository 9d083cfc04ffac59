//! LRC (time-synced lyric) helpers
//!
//! Synced lyrics are otherwise treated as an opaque blob. The only processing done here is
//! recovering plain lines when a catalog entry carries synced lyrics but no plain text.

/// Strip timestamps and metadata tags, returning the plain lyric lines
///
/// `[ar:Artist]` style metadata lines are dropped; `[01:02.34]` timestamps (possibly
/// repeated on one line) are removed. Blank lines inside the lyric body are kept.
pub fn plain_lines(lrc: &str) -> Vec<String> {
    let mut lines = Vec::new();

    for raw in lrc.lines() {
        let mut rest = raw.trim();
        let mut had_timestamp = false;
        let mut metadata = false;

        while let Some(after_open) = rest.strip_prefix('[') {
            let Some(close) = after_open.find(']') else {
                break;
            };
            let tag = &after_open[..close];
            if is_timestamp(tag) {
                had_timestamp = true;
            } else {
                metadata = true;
            }
            rest = after_open[close + 1..].trim_start();
        }

        if metadata && !had_timestamp {
            continue;
        }
        lines.push(rest.trim_end().to_string());
    }

    // Leading/trailing blank lines carry no content
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let first_content = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    lines.drain(..first_content);

    lines
}

/// `mm:ss`, `mm:ss.xx` or `mm:ss:xx`
fn is_timestamp(tag: &str) -> bool {
    let mut parts = tag.splitn(2, ':');
    let minutes = parts.next().unwrap_or_default();
    let seconds = parts.next().unwrap_or_default();

    !minutes.is_empty()
        && minutes.chars().all(|c| c.is_ascii_digit())
        && !seconds.is_empty()
        && seconds.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ':')
}
