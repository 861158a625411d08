use std::path::Path;

use crate::clock::Clock;

/// Longest slug kept from the uploaded file's base name.
pub const MAX_SLUG_LEN: usize = 90;

/// `<slug(base name)>-<unix timestamp>.<extension>`.
///
/// Two uploads with the same base name in the same second get the same name;
/// nothing retries on collision.
pub fn derive_name(original_filename: &str, extension: &str, clock: &dyn Clock) -> String {
    let file_name = Path::new(original_filename.trim())
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    // Everything before the last dot; a lone leading dot leaves nothing.
    let base = match file_name.rfind('.') {
        Some(i) => &file_name[..i],
        None => file_name,
    }
    .trim();
    let mut slug = slug::slugify(base);
    // slugify only ever emits ASCII, so byte truncation is char-safe.
    slug.truncate(MAX_SLUG_LEN);
    format!("{}-{}.{}", slug, clock.now().unix_timestamp(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use time::macros::datetime;

    fn clock() -> FixedClock {
        FixedClock(datetime!(2021-08-19 15:57:10 UTC))
    }

    #[test]
    fn slugs_base_name_and_appends_timestamp() {
        assert_eq!(
            derive_name("Django Logo Negative.png", "png", &clock()),
            "django-logo-negative-1629388630.png"
        );
    }

    #[test]
    fn drops_only_last_extension() {
        assert_eq!(
            derive_name("backup.tar.gz", "gz", &clock()),
            "backup-tar-1629388630.gz"
        );
    }

    #[test]
    fn transliterates_and_collapses_separators() {
        assert_eq!(
            derive_name("  Crème   Brûlée!!.jpg ", "jpg", &clock()),
            "creme-brulee-1629388630.jpg"
        );
    }

    #[test]
    fn truncates_long_names() {
        let long = format!("{}.jpeg", "a".repeat(200));
        let name = derive_name(&long, "jpeg", &clock());
        assert_eq!(name, format!("{}-1629388630.jpeg", "a".repeat(MAX_SLUG_LEN)));
    }

    #[test]
    fn dotfile_has_empty_base_name() {
        assert_eq!(derive_name(".png", "png", &clock()), "-1629388630.png");
        assert_eq!(derive_name(".hidden.png", "png", &clock()), "hidden-1629388630.png");
        assert_eq!(derive_name("uploads/logo.png", "png", &clock()), "logo-1629388630.png");
    }

    #[test]
    fn deterministic_for_same_instant() {
        let c = clock();
        assert_eq!(
            derive_name("widget.jpg", "jpg", &c),
            derive_name("widget.jpg", "jpg", &c)
        );
    }
}
