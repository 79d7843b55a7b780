use std::path::Path;

use depot_verify::{DigestKind, Verification, side_file_path, verify_file, write_side_file};

use super::{Policy, PolicyContext, PolicyError};

const IGNORED: &str = "ignored";
const FAIL: &str = "fail";
const FIX: &str = "fix";

const OPTIONS: &[&str] = &[IGNORED, FAIL, FIX];

/// Validates or repairs the `.sha1` / `.md5` side-files of a fetched file.
///
/// - `fail` rejects the file unless at least one side-file is present and
///   every present side-file matches; a rejected file is deleted together
///   with both side-files.
/// - `fix` (re)writes every missing or wrong side-file and keeps the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecksumPolicy;

impl ChecksumPolicy {
    pub const ID: &'static str = "checksum";
}

impl Policy for ChecksumPolicy {
    fn id(&self) -> &'static str { Self::ID }

    fn options(&self) -> &'static [&'static str] { OPTIONS }

    fn default_option(&self) -> &'static str { FIX }

    fn evaluate(&self, setting: &str, _context: &PolicyContext, local_file: &Path) -> Result<bool, PolicyError> {
        self.validate(setting)?;
        if setting == IGNORED || !local_file.is_file() {
            return Ok(true);
        }

        match setting {
            FAIL => verify(local_file),
            _ => fix(local_file),
        }
    }
}

fn verify(file: &Path) -> Result<bool, PolicyError> {
    let mut present = 0;
    for kind in DigestKind::ALL {
        match verify_file(file, kind)? {
            Verification::Absent => {}
            Verification::Valid => present += 1,
            Verification::Invalid { expected, actual } => {
                tracing::warn!(
                    file = %file.display(),
                    %kind,
                    expected = expected.as_deref().unwrap_or("<unparseable>"),
                    %actual,
                    "checksum mismatch"
                );
                discard(file);
                return Ok(false);
            }
        }
    }

    if present == 0 {
        tracing::warn!(file = %file.display(), "no checksum side-files");
        discard(file);
        return Ok(false);
    }
    Ok(true)
}

fn fix(file: &Path) -> Result<bool, PolicyError> {
    for kind in DigestKind::ALL {
        if verify_file(file, kind)? != Verification::Valid {
            let digest = write_side_file(file, kind)?;
            tracing::debug!(file = %file.display(), %kind, %digest, "rewrote checksum");
        }
    }
    Ok(true)
}

/// Remove the file and both side-files, ignoring ones already gone.
fn discard(file: &Path) {
    let side_files = DigestKind::ALL.map(|kind| side_file_path(file, kind));
    for path in std::iter::once(file).chain(side_files.iter().map(|p| p.as_path())) {
        if let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove rejected file");
        }
    }
}

#[cfg(test)]
mod tests {
    use depot_verify::digest_file;

    use super::*;

    const SHA1_OF_CONTENT: &str = "040f06fd774092478d450774f5ba30c5da78acc8";

    fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("a-1.0.jar");
        std::fs::write(&main, "content").unwrap();
        (dir, main)
    }

    fn apply(setting: &str, file: &Path) -> bool { ChecksumPolicy.apply(setting, &PolicyContext::new(), file) }

    fn side(main: &Path, kind: DigestKind) -> std::path::PathBuf { side_file_path(main, kind) }

    #[test]
    fn test_fail_without_side_files_deletes_main() {
        let (_dir, main) = fixture();
        assert!(!apply(FAIL, &main));
        assert!(!main.exists());
    }

    #[test]
    fn test_fail_with_one_valid_side_file() {
        let (_dir, main) = fixture();
        std::fs::write(side(&main, DigestKind::Sha1), SHA1_OF_CONTENT).unwrap();
        assert!(apply(FAIL, &main));
        assert!(main.exists());
    }

    #[test]
    fn test_fail_with_one_invalid_side_file_deletes_everything() {
        let (_dir, main) = fixture();
        std::fs::write(side(&main, DigestKind::Sha1), SHA1_OF_CONTENT).unwrap();
        std::fs::write(side(&main, DigestKind::Md5), "00000000000000000000000000000000").unwrap();

        assert!(!apply(FAIL, &main));
        assert!(!main.exists());
        assert!(!side(&main, DigestKind::Sha1).exists());
        assert!(!side(&main, DigestKind::Md5).exists());
    }

    #[test]
    fn test_fix_writes_missing_side_files() {
        let (_dir, main) = fixture();
        assert!(apply(FIX, &main));
        assert!(main.exists());

        let sha1 = std::fs::read_to_string(side(&main, DigestKind::Sha1)).unwrap();
        assert_eq!(sha1, format!("{SHA1_OF_CONTENT}  a-1.0.jar\n"));
        assert_eq!(verify_file(&main, DigestKind::Md5).unwrap(), Verification::Valid);
    }

    #[test]
    fn test_fix_repairs_invalid_side_file() {
        let (_dir, main) = fixture();
        std::fs::write(side(&main, DigestKind::Md5), "garbage").unwrap();
        assert!(apply(FIX, &main));
        let md5 = digest_file(&main, DigestKind::Md5).unwrap();
        assert!(std::fs::read_to_string(side(&main, DigestKind::Md5)).unwrap().starts_with(&md5));
    }

    #[test]
    fn test_fix_is_idempotent() {
        let (_dir, main) = fixture();
        assert!(apply(FIX, &main));
        let first: Vec<_> = DigestKind::ALL.map(|k| std::fs::read(side(&main, k)).unwrap()).into();
        assert!(apply(FIX, &main));
        let second: Vec<_> = DigestKind::ALL.map(|k| std::fs::read(side(&main, k)).unwrap()).into();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ignored_accepts_anything() {
        let (_dir, main) = fixture();
        std::fs::write(side(&main, DigestKind::Sha1), "wrong").unwrap();
        assert!(apply(IGNORED, &main));
        assert!(main.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_fix_digest_failure_keeps_content() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, main) = fixture();
        std::fs::set_permissions(&main, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::File::open(&main).is_ok() {
            // Running as root: permissions are not enforced.
            return;
        }

        let result = ChecksumPolicy.evaluate(FIX, &PolicyContext::new(), &main);
        assert!(matches!(result, Err(PolicyError::Digest(_))));
        assert!(main.exists());
        drop(dir);
    }
}
