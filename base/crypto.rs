//! Key derivation and at-rest file encryption for sealed study media.
//!
//! A PBKDF2-HMAC-SHA256 key derivation with the study id as salt, and
//! whole-file authenticated encryption producing a `.enc` sibling file.
//! AES-256-GCM (via `ring`) provides the AEAD; the sealed blob carries no
//! in-band header beyond the AEAD framing itself.

use crate::{bail, err, Error, ErrorKind, ResultExt};
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use std::fs;
use std::io::Write;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derives a 32-byte AES-256 key from a study PIN, salted with the study's
/// id so the same PIN yields different keys across studies.
pub fn derive_key(study_id: &[u8], pin: &str) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).unwrap();
    ring::pbkdf2::derive(
        ring::pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        study_id,
        pin.as_bytes(),
        &mut key,
    );
    key
}

fn sealing_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, Error> {
    let unbound = UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| err!(Internal, "invalid AES-256-GCM key length"))?;
    Ok(LessSafeKey::new(unbound))
}

/// Reads `path` in full, seals it with the key derived from `(study_id,
/// pin)`, and writes the sealed blob to `path` with `.enc` appended. The
/// plaintext is only deleted after the sealed file is fully written and
/// flushed; any failure before that point leaves the plaintext untouched and
/// no (or only a partial, never-renamed-into-place) sealed file behind.
pub fn encrypt_file(path: &Path, study_id: &[u8], pin: &str) -> Result<PathBuf, Error> {
    let plaintext = fs::read(path).err_kind(ErrorKind::Internal)?;
    let key = sealing_key(&derive_key(study_id, pin))?;

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| err!(Internal, "failed to generate nonce"))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext;
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| err!(Internal, "AEAD seal failed"))?;

    let sealed_path = {
        let mut s = path.as_os_str().to_owned();
        s.push(".enc");
        PathBuf::from(s)
    };
    let tmp_path = sealed_path.with_extension("enc.tmp");
    {
        let mut f = fs::File::create(&tmp_path).err_kind(ErrorKind::Internal)?;
        f.write_all(&nonce_bytes).err_kind(ErrorKind::Internal)?;
        f.write_all(&in_out).err_kind(ErrorKind::Internal)?;
        f.sync_all().err_kind(ErrorKind::Internal)?;
    }
    fs::rename(&tmp_path, &sealed_path).err_kind(ErrorKind::Internal)?;
    fs::remove_file(path).err_kind(ErrorKind::Internal)?;
    Ok(sealed_path)
}

/// Unseals `sealed_path` into a fresh temporary file the caller owns and
/// must delete. Fails with `ErrorKind::Unauthenticated` if `pin` is wrong or
/// the file was tampered with — AEAD authentication failure and a wrong
/// key are indistinguishable, which is the desired behavior here.
pub fn decrypt_file(
    sealed_path: &Path,
    study_id: &[u8],
    pin: &str,
    dest_dir: &Path,
) -> Result<PathBuf, Error> {
    let blob = fs::read(sealed_path).err_kind(ErrorKind::Internal)?;
    if blob.len() < NONCE_LEN {
        bail!(Unauthenticated, "sealed file too short to contain a nonce");
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let mut nonce_arr = [0u8; NONCE_LEN];
    nonce_arr.copy_from_slice(nonce_bytes);
    let nonce = Nonce::assume_unique_for_key(nonce_arr);

    let key = sealing_key(&derive_key(study_id, pin))?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| err!(Unauthenticated, "bad pin or tampered file"))?;

    let file_name = sealed_path
        .file_stem()
        .ok_or_else(|| err!(Internal, "sealed path has no file name"))?;
    let tmp_path = dest_dir.join(file_name);
    let mut f = fs::File::create(&tmp_path).err_kind(ErrorKind::Internal)?;
    f.write_all(plaintext).err_kind(ErrorKind::Internal)?;
    f.sync_all().err_kind(ErrorKind::Internal)?;
    Ok(tmp_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        fs::write(&path, b"not really a video").unwrap();

        let study_id = b"study-0001";
        let sealed = encrypt_file(&path, study_id, "1234").unwrap();
        assert!(!path.exists());
        assert!(sealed.exists());
        assert_eq!(sealed.extension().unwrap(), "enc");

        let out_dir = tempfile::tempdir().unwrap();
        let restored = decrypt_file(&sealed, study_id, "1234", out_dir.path()).unwrap();
        let mut contents = Vec::new();
        fs::File::open(&restored)
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"not really a video");
    }

    #[test]
    fn wrong_pin_fails_without_writing_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        fs::write(&path, b"secret frames").unwrap();
        let study_id = b"study-0002";
        let sealed = encrypt_file(&path, study_id, "1234").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let err = decrypt_file(&sealed, study_id, "0000", out_dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn derive_key_is_deterministic_and_study_scoped() {
        let k1 = derive_key(b"study-a", "1234");
        let k2 = derive_key(b"study-a", "1234");
        let k3 = derive_key(b"study-b", "1234");
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }
}
