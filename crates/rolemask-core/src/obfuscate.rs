//! The name obfuscation engine.
//!
//! Names are derived from an HMAC over the subject name (or its random key),
//! rendered into a format template, stripped to alphanumerics plus the
//! subject's chosen dividers, optionally chunked with those dividers, and
//! truncated to the platform limit.
//!
//! Derivation is deterministic: identical inputs always produce identical
//! bytes. Idempotent resync depends on it.

use blake2::Blake2s256;
use hmac::{
  Hmac, Mac, SimpleHmac,
  digest::{Digest, KeyInit, core_api::BlockSizeUser, generic_array::GenericArray},
};
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use sha2::Sha256;

use crate::{
  config::{
    ALLOWED_DIVIDERS, ConfigValues, HashAlgorithm, HashEncoding, ObfuscationMethod,
    ROLE_NAME_MAX_LEN,
  },
  settings::EngineSettings,
};

/// Template used when neither the subject nor the engine provides one.
pub const DEFAULT_FORMAT: &str = "{hash12}";

/// Every placeholder a format template may contain.
pub const PLACEHOLDERS: [&str; 4] = ["{prefix}", "{hash8}", "{hash12}", "{hash16}"];

pub const RANDOM_KEY_LEN: usize = 16;

/// A fresh 16-character alphanumeric key from the OS CSPRNG.
pub fn generate_random_key() -> String {
  OsRng
    .sample_iter(&Alphanumeric)
    .take(RANDOM_KEY_LEN)
    .map(char::from)
    .collect()
}

/// Whether `key` has the shape of a generated random key.
pub fn is_random_key(key: &str) -> bool {
  key.chars().count() == RANDOM_KEY_LEN && key.chars().all(|c| c.is_ascii_alphanumeric())
}

// ─── Hashing ─────────────────────────────────────────────────────────────────

/// The secret as an HMAC block key: zero-padded, or hashed first when longer
/// than a block. HMAC itself does the same to any key it is given.
fn block_key<D: Digest + BlockSizeUser>(secret: &[u8]) -> GenericArray<u8, D::BlockSize> {
  let mut key = GenericArray::<u8, D::BlockSize>::default();
  if secret.len() > key.len() {
    let digest = D::digest(secret);
    key[..digest.len()].copy_from_slice(&digest);
  } else {
    key[..secret.len()].copy_from_slice(secret);
  }
  key
}

fn keyed_digest(secret: &str, input: &str, algorithm: HashAlgorithm) -> Vec<u8> {
  match algorithm {
    HashAlgorithm::Sha256 => {
      let mut mac = <Hmac<Sha256> as KeyInit>::new(&block_key::<Sha256>(secret.as_bytes()));
      mac.update(input.as_bytes());
      mac.finalize().into_bytes().to_vec()
    }
    HashAlgorithm::Blake2s => {
      let mut mac =
        <SimpleHmac<Blake2s256> as KeyInit>::new(&block_key::<Blake2s256>(secret.as_bytes()));
      mac.update(input.as_bytes());
      mac.finalize().into_bytes().to_vec()
    }
  }
}

fn encode_digest(digest: &[u8], encoding: HashEncoding) -> String {
  match encoding {
    HashEncoding::Hex => hex::encode(digest),
    HashEncoding::Base32 => {
      base32::encode(base32::Alphabet::RFC4648 { padding: false }, digest)
    }
  }
}

// ─── Text shaping ────────────────────────────────────────────────────────────

/// Keep alphanumerics and members of `dividers`; drop everything else.
pub fn sanitize(value: &str, dividers: &[char]) -> String {
  value
    .chars()
    .filter(|c| c.is_alphanumeric() || dividers.contains(c))
    .collect()
}

/// Split `value` into `width`-character chunks and join them with
/// `dividers`, cycling through the set. Returns `value` unchanged when there
/// are no dividers, `width` is zero, or only one chunk results.
pub fn insert_dividers(value: &str, dividers: &[char], width: usize) -> String {
  if dividers.is_empty() || width == 0 {
    return value.to_owned();
  }
  let chars: Vec<char> = value.chars().collect();
  let mut chunks = chars.chunks(width);
  let Some(first) = chunks.next() else {
    return value.to_owned();
  };

  let mut out: String = first.iter().collect();
  for (chunk, divider) in chunks.zip(dividers.iter().cycle()) {
    out.push(*divider);
    out.extend(chunk.iter());
  }
  out
}

fn truncate(value: &str) -> String { value.chars().take(ROLE_NAME_MAX_LEN).collect() }

/// Literal (non-pattern) placeholder replacement.
fn apply_format(format: &str, tokens: &[(&str, &str)]) -> String {
  tokens
    .iter()
    .fold(format.to_owned(), |acc, (placeholder, value)| acc.replace(placeholder, value))
}

// ─── Derivation ──────────────────────────────────────────────────────────────

/// Derive a display name for `input`.
///
/// `prefix` is cleaned against the global divider alphabet, while the final
/// output is cleaned against the subject's own `dividers`. An empty `format`
/// means [`DEFAULT_FORMAT`].
pub fn derive_display_name(
  input:     &str,
  method:    ObfuscationMethod,
  secret:    &str,
  prefix:    &str,
  format:    &str,
  dividers:  &[char],
  min_chars: usize,
) -> String {
  let digest = keyed_digest(secret, input, method.algorithm());
  let hash = encode_digest(&digest, method.encoding());

  let mut template = if format.is_empty() { DEFAULT_FORMAT.to_owned() } else { format.to_owned() };
  if !prefix.is_empty() && !template.contains("{prefix}") {
    template.insert_str(0, "{prefix}");
  }

  let clean_prefix = sanitize(prefix, &ALLOWED_DIVIDERS);
  let tokens = [
    ("{prefix}", clean_prefix.as_str()),
    ("{hash8}", &hash[..8]),
    ("{hash12}", &hash[..12]),
    ("{hash16}", &hash[..16]),
  ];

  let value = sanitize(&apply_format(&template, &tokens), dividers);
  let value = insert_dividers(&value, dividers, min_chars);
  truncate(&sanitize(&value, dividers))
}

/// The name a subject should carry on the platform, given its configuration.
///
/// Precedence: `opt_out` → custom name → hash of the random key (when
/// enabled and present) → hash of the real name. Without a configuration the
/// engine defaults apply.
pub fn resolve_desired_name(
  subject_name: &str,
  values:       Option<&ConfigValues>,
  engine:       &EngineSettings,
) -> String {
  let Some(values) = values else {
    return derive_display_name(
      subject_name,
      engine.default_method,
      &engine.secret,
      &engine.prefix,
      &engine.format,
      &[],
      0,
    );
  };

  if values.opt_out {
    return subject_name.to_owned();
  }

  let dividers = values.dividers.as_slice();
  if !values.custom_name.is_empty() {
    return truncate(&sanitize(&values.custom_name, dividers));
  }

  let input = if values.use_random_key && !values.random_key.is_empty() {
    values.random_key.as_str()
  } else {
    subject_name
  };
  let format = if values.format.is_empty() { &engine.format } else { &values.format };

  derive_display_name(
    input,
    values.method,
    &engine.secret,
    &engine.prefix,
    format,
    dividers,
    values.min_chars_before_divider as usize,
  )
}

/// Pure preview for editing surfaces: no store and no platform access.
pub fn preview_name(subject_name: &str, draft: &ConfigValues, engine: &EngineSettings) -> String {
  resolve_desired_name(subject_name, Some(draft), engine)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Dividers;

  fn engine() -> EngineSettings {
    EngineSettings { secret: "secret".into(), ..Default::default() }
  }

  #[test]
  fn block_key_matches_hmac_key_handling() {
    let long = "k".repeat(200);
    for secret in ["", "secret", long.as_str()] {
      let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes()).unwrap();
      mac.update(b"Alpha");
      let expected = mac.finalize().into_bytes().to_vec();
      assert_eq!(keyed_digest(secret, "Alpha", HashAlgorithm::Sha256), expected);

      let mut mac = <SimpleHmac<Blake2s256> as Mac>::new_from_slice(secret.as_bytes()).unwrap();
      mac.update(b"Alpha");
      let expected = mac.finalize().into_bytes().to_vec();
      assert_eq!(keyed_digest(secret, "Alpha", HashAlgorithm::Blake2s), expected);
    }
  }

  #[test]
  fn prefix_and_hash8_example() {
    let name = derive_display_name(
      "Test Group",
      ObfuscationMethod::Sha256Hex,
      "secret",
      "grp",
      "{prefix}{hash8}",
      &[],
      0,
    );
    assert!(name.starts_with("grp"));
    assert_eq!(name.len(), "grp".len() + 8);
  }

  #[test]
  fn prefix_is_prepended_when_format_lacks_placeholder() {
    let name = derive_display_name(
      "Test Group",
      ObfuscationMethod::Sha256Hex,
      "secret",
      "grp",
      "{hash8}",
      &[],
      0,
    );
    assert!(name.starts_with("grp"));
    assert_eq!(name.chars().count(), 11);
  }

  #[test]
  fn derivation_is_deterministic_for_every_method() {
    for method in [
      ObfuscationMethod::Sha256Hex,
      ObfuscationMethod::Sha256Base32,
      ObfuscationMethod::Blake2sHex,
      ObfuscationMethod::Blake2sBase32,
    ] {
      let a = derive_display_name("Alpha", method, "k", "", "{hash16}", &['┃'], 4);
      let b = derive_display_name("Alpha", method, "k", "", "{hash16}", &['┃'], 4);
      assert_eq!(a, b);
    }
  }

  #[test]
  fn methods_and_secrets_change_the_output() {
    let base = derive_display_name("Alpha", ObfuscationMethod::Sha256Hex, "k", "", "", &[], 0);
    let blake = derive_display_name("Alpha", ObfuscationMethod::Blake2sHex, "k", "", "", &[], 0);
    let other = derive_display_name("Alpha", ObfuscationMethod::Sha256Hex, "k2", "", "", &[], 0);
    assert_ne!(base, blake);
    assert_ne!(base, other);
    assert_eq!(base.len(), 12);
  }

  #[test]
  fn hex_is_lowercase_and_base32_is_unpadded() {
    let hex = derive_display_name("A", ObfuscationMethod::Sha256Hex, "s", "", "{hash16}", &[], 0);
    assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

    let b32 =
      derive_display_name("A", ObfuscationMethod::Sha256Base32, "s", "", "{hash16}", &[], 0);
    assert!(b32.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
  }

  #[test]
  fn output_only_contains_alphanumerics_and_chosen_dividers() {
    let dividers = ['┃', '➖'];
    let name = derive_display_name(
      "Alpha",
      ObfuscationMethod::Sha256Base32,
      "s",
      "a b┆c!",
      "{prefix}--{hash16}::{hash8}",
      &dividers,
      3,
    );
    assert!(name.chars().all(|c| c.is_alphanumeric() || dividers.contains(&c)));
    assert!(name.chars().count() <= ROLE_NAME_MAX_LEN);
  }

  #[test]
  fn output_is_truncated_to_the_platform_limit() {
    let format = "{hash16}".repeat(10);
    let name = derive_display_name("A", ObfuscationMethod::Sha256Hex, "s", "", &format, &['┃'], 2);
    assert_eq!(name.chars().count(), ROLE_NAME_MAX_LEN);
  }

  #[test]
  fn dividers_cycle_between_fixed_width_chunks() {
    let out = insert_dividers("abcdefghij", &['┃', '➖'], 4);
    assert_eq!(out, "abcd┃efgh➖ij");
    let stripped: String = out.chars().filter(|c| c.is_alphanumeric()).collect();
    assert_eq!(stripped, "abcdefghij");
  }

  #[test]
  fn dividers_skipped_for_single_chunk_or_zero_width() {
    assert_eq!(insert_dividers("abc", &['┃'], 4), "abc");
    assert_eq!(insert_dividers("abcdef", &['┃'], 0), "abcdef");
    assert_eq!(insert_dividers("abcdef", &[], 2), "abcdef");
    assert_eq!(insert_dividers("", &['┃'], 2), "");
  }

  #[test]
  fn opt_out_returns_real_name_regardless_of_other_fields() {
    let values = ConfigValues {
      opt_out:        true,
      custom_name:    "Other".into(),
      use_random_key: true,
      random_key:     "abcdefgh12345678".into(),
      ..Default::default()
    };
    assert_eq!(resolve_desired_name("Real Name!", Some(&values), &engine()), "Real Name!");
  }

  #[test]
  fn custom_name_is_sanitized_against_chosen_dividers() {
    let values = ConfigValues {
      custom_name:              "Ops┃Team➖!".into(),
      dividers:                 Dividers::filtered(['┃']),
      min_chars_before_divider: 2,
      ..Default::default()
    };
    assert_eq!(resolve_desired_name("x", Some(&values), &engine()), "Ops┃Team");
  }

  #[test]
  fn random_key_replaces_subject_name_as_hash_input() {
    let with_key = ConfigValues {
      use_random_key: true,
      random_key:     "abcdefgh12345678".into(),
      ..Default::default()
    };
    let a = resolve_desired_name("Alpha", Some(&with_key), &engine());
    let b = resolve_desired_name("Beta", Some(&with_key), &engine());
    assert_eq!(a, b);

    let plain = ConfigValues::default();
    assert_ne!(resolve_desired_name("Alpha", Some(&plain), &engine()), a);
  }

  #[test]
  fn missing_config_uses_engine_defaults() {
    let e = engine();
    let expected =
      derive_display_name("Alpha", e.default_method, &e.secret, &e.prefix, &e.format, &[], 0);
    assert_eq!(resolve_desired_name("Alpha", None, &e), expected);
  }

  #[test]
  fn generated_keys_have_the_expected_shape() {
    let key = generate_random_key();
    assert!(is_random_key(&key));
    assert_ne!(key, generate_random_key());
  }
}
