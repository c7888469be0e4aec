//! Rewriting of external watch links into embeddable player URLs
//!
//! Supported hosts:
//! - `youtube.com/watch?v=ID` → `https://www.youtube.com/embed/ID`
//! - `youtu.be/ID` → `https://www.youtube.com/embed/ID`
//! - `drive.google.com/file/d/ID/view` → `https://drive.google.com/file/d/ID/preview`
//!
//! Every other link is returned unchanged.

use url::Url;

/// Convert a watch link into the URL to put in an `<iframe>`
///
/// # Examples
///
/// ```
/// use suzuani_common::embed::embed_url;
///
/// assert_eq!(
///     embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
///     "https://www.youtube.com/embed/dQw4w9WgXcQ"
/// );
/// assert_eq!(embed_url("https://vimeo.com/123"), "https://vimeo.com/123");
/// assert_eq!(embed_url(""), "");
/// ```
pub fn embed_url(watch_link: &str) -> String {
    if watch_link.is_empty() {
        return String::new();
    }

    if let Ok(parsed) = Url::parse(watch_link) {
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        if host.contains("youtube.com") {
            // Blank `v=` values count as absent
            let video_id = parsed
                .query_pairs()
                .find(|(key, value)| key == "v" && !value.is_empty());
            if let Some((_, video_id)) = video_id {
                return format!("https://www.youtube.com/embed/{}", video_id);
            }
        } else if host.contains("youtu.be") {
            let video_id = parsed.path().trim_start_matches('/');
            return format!("https://www.youtube.com/embed/{}", video_id);
        }
    }

    if watch_link.contains("drive.google.com") {
        let segments: Vec<&str> = watch_link.split('/').collect();
        if segments.len() >= 2 {
            let file_id = segments[segments.len() - 2];
            return format!("https://drive.google.com/file/d/{}/preview", file_id);
        }
    }

    watch_link.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_watch_link() {
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=abc123&t=42s"),
            "https://www.youtube.com/embed/abc123"
        );
        assert_eq!(
            embed_url("https://m.youtube.com/watch?feature=share&v=xyz"),
            "https://www.youtube.com/embed/xyz"
        );
    }

    #[test]
    fn test_youtube_without_video_param_unchanged() {
        let link = "https://www.youtube.com/channel/UC123";
        assert_eq!(embed_url(link), link);
    }

    #[test]
    fn test_youtube_blank_video_param_unchanged() {
        let link = "https://www.youtube.com/watch?v=";
        assert_eq!(embed_url(link), link);

        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=&v=abc123"),
            "https://www.youtube.com/embed/abc123"
        );
    }

    #[test]
    fn test_short_youtube_link() {
        assert_eq!(
            embed_url("https://youtu.be/abc123"),
            "https://www.youtube.com/embed/abc123"
        );
    }

    #[test]
    fn test_google_drive_link() {
        assert_eq!(
            embed_url("https://drive.google.com/file/d/1AbCdEf/view?usp=sharing"),
            "https://drive.google.com/file/d/1AbCdEf/preview"
        );
    }

    #[test]
    fn test_other_links_unchanged() {
        assert_eq!(embed_url("https://example.com/video.mp4"), "https://example.com/video.mp4");
        assert_eq!(embed_url("not a url"), "not a url");
        assert_eq!(embed_url(""), "");
    }
}
