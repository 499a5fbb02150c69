//! Scene document reference rewriting
//!
//! Replaces the `"uri"` fields of a glTF document that point at files packed
//! in the archive with the `blob:` URIs those files were registered under.
//! References that don't name a packed file are left exactly as they were.

use std::{borrow::Cow, sync::OnceLock};

use regex::{Captures, Regex};

use super::{archive::basename, blob::ReferenceMap};

fn uri_field() -> &'static Regex {
    static URI_FIELD: OnceLock<Regex> = OnceLock::new();
    URI_FIELD.get_or_init(|| {
        Regex::new(r#""uri"\s*:\s*"([^"]+)""#).expect("uri field pattern is valid")
    })
}

/// Outcome of one rewrite pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten<'a> {
    pub document: Cow<'a, str>,
    /// Number of references replaced by a blob URI
    pub replaced: usize,
    /// Reference values left untouched, in document order
    pub unresolved: Vec<String>,
}

/// Rewrites every packed-file reference in `document` using `references`
///
/// A reference whose basename equals the binary payload's canonical name gets
/// the binary URI; otherwise a basename found among the textures gets that
/// texture's URI. Matches are independent, so substitution order is irrelevant.
pub fn rewrite_references<'a>(document: &'a str, references: &ReferenceMap) -> Rewritten<'a> {
    let mut replaced = 0;
    let mut unresolved = Vec::new();

    let document = uri_field().replace_all(document, |caps: &Captures| {
        let whole = &caps[0];
        let value = &caps[1];
        let name = basename(value);

        let target = match &references.binary {
            Some((binary_name, binary_uri)) if name == binary_name.as_str() => Some(binary_uri),
            _ => references.textures.get(name),
        };

        match target {
            Some(uri) => {
                replaced += 1;
                format!(r#""uri": "{}""#, uri)
            }
            None => {
                unresolved.push(value.to_string());
                whole.to_string()
            }
        }
    });

    Rewritten {
        document,
        replaced,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn references() -> ReferenceMap {
        let mut map = ReferenceMap {
            binary: Some(("scene.bin".into(), "blob:meshpaint/1".into())),
            ..Default::default()
        };
        map.textures
            .insert("albedo.png".into(), "blob:meshpaint/2".into());
        map.textures
            .insert("normal.png".into(), "blob:meshpaint/3".into());
        map
    }

    #[test]
    fn test_replaces_binary_and_textures() {
        let doc = r#"{"buffers":[{"uri": "scene.bin","byteLength":4}],
            "images":[{"uri":"textures/albedo.png"},{"uri" :  "textures/normal.png"}]}"#;

        let out = rewrite_references(doc, &references());

        assert_eq!(out.replaced, 3);
        assert!(out.unresolved.is_empty());
        assert!(out.document.contains(r#""uri": "blob:meshpaint/1""#));
        assert!(out.document.contains(r#""uri": "blob:meshpaint/2""#));
        assert!(out.document.contains(r#""uri": "blob:meshpaint/3""#));
        assert!(!out.document.contains("textures/albedo.png"));
        assert!(!out.document.contains("textures/normal.png"));
        assert!(!out.document.contains("\"scene.bin\""));
    }

    #[test]
    fn test_external_references_are_untouched() {
        let doc = r#"{"images":[{"uri":"https://example.com/sky.png"},{"uri":"textures/albedo.png"},
            {"uri":"data:image/png;base64,AAAA"}]}"#;

        let out = rewrite_references(doc, &references());

        assert_eq!(out.replaced, 1);
        assert!(out.document.contains(r#"{"uri":"https://example.com/sky.png"}"#));
        assert!(out.document.contains(r#"{"uri":"data:image/png;base64,AAAA"}"#));
        assert_eq!(
            out.unresolved,
            vec!["https://example.com/sky.png", "data:image/png;base64,AAAA"]
        );
    }

    #[test]
    fn test_document_without_matches_is_returned_unchanged() {
        let doc = "{\n  \"images\" : [ { \"uri\"  :\t\"elsewhere/rock.png\" } ],\n  \"asset\": {\"version\":\"2.0\"}\n}";

        let out = rewrite_references(doc, &references());

        assert_eq!(out.document, doc);
        assert_eq!(out.replaced, 0);
    }

    #[test]
    fn test_binary_matched_by_basename() {
        let doc = r#"{"buffers":[{"uri":"./data/scene.bin"}]}"#;
        let out = rewrite_references(doc, &references());
        assert_eq!(out.document, r#"{"buffers":[{"uri": "blob:meshpaint/1"}]}"#);
    }

    #[test]
    fn test_binary_name_wins_over_texture_of_same_name() {
        let mut map = references();
        map.textures
            .insert("scene.bin".into(), "blob:meshpaint/9".into());

        let out = rewrite_references(r#"{"uri":"scene.bin"}"#, &map);
        assert_eq!(out.document, r#"{"uri": "blob:meshpaint/1"}"#);
    }
}
