use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Picks `<dir>/<random><extension>` that `exists` reports as free.
///
/// Names are 128-bit random tokens, so the loop practically never repeats.
/// The name is only checked, not reserved: a concurrent caller could still
/// claim it before the file is created.
pub(crate) fn unique_path(dir: &Path, extension: &str, exists: impl Fn(&Path) -> bool) -> PathBuf {
    loop {
        let candidate = dir.join(format!("{}{}", Uuid::new_v4().simple(), extension));
        if !exists(&candidate) {
            return candidate;
        }
        tracing::trace!(path = %candidate.display(), "Generated filename already taken; resampling");
    }
}

/// Appends `.pdf` unless the path already mentions `.pdf` *anywhere*.
///
/// This is a substring check, not a suffix check: `report.pdf.tmp` and
/// `/srv/site.pdfs/out` are both left alone.
pub(crate) fn ensure_pdf_extension(path: PathBuf) -> PathBuf {
    if path.to_string_lossy().contains(".pdf") {
        return path;
    }
    let mut path = path.into_os_string();
    path.push(".pdf");
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    #[rstest]
    #[case("/tmp/out", "/tmp/out.pdf")]
    #[case("/tmp/out.pdf", "/tmp/out.pdf")]
    #[case("/tmp/out.PDF", "/tmp/out.PDF.pdf")]
    #[case("/tmp/report.pdf.tmp", "/tmp/report.pdf.tmp")]
    #[case("/srv/site.pdfs/out", "/srv/site.pdfs/out")]
    #[case("relative/file.html", "relative/file.html.pdf")]
    fn test_ensure_pdf_extension(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(ensure_pdf_extension(PathBuf::from(input)), PathBuf::from(expected));
    }

    #[test]
    fn test_unique_path_shape() {
        let path = unique_path(Path::new("/tmp/staging"), ".html", |_| false);
        assert_eq!(path.parent(), Some(Path::new("/tmp/staging")));
        let name = path.file_name().unwrap().to_str().unwrap();
        let (stem, extension) = name.split_once('.').unwrap();
        assert_eq!(extension, "html");
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_unique_path_resamples_on_collision() {
        let checks = Cell::new(0);
        let path = unique_path(Path::new("/tmp"), ".pdf", |_| {
            checks.set(checks.get() + 1);
            // Pretend the first three candidates are already taken.
            checks.get() <= 3
        });
        assert_eq!(checks.get(), 4);
        assert!(path.to_string_lossy().ends_with(".pdf"));
    }

    #[test]
    fn test_unique_path_never_returns_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = Vec::new();
        for _ in 0..50 {
            let path = unique_path(dir.path(), ".pdf", Path::exists);
            assert!(!path.exists());
            std::fs::write(&path, b"").unwrap();
            seen.push(path);
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 50);
    }
}
