//! Integration tests for rewind.
//!
//! Each test seeds a tempdir-backed local store, runs a batch, and
//! inspects the resulting filesystem state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rewind::config::{Config, LayoutConfig, StoreConfig};
use rewind::run_batch;

fn config_for(root: &Path) -> Config {
    Config {
        store: StoreConfig {
            url: root.to_str().unwrap().to_string(),
            storage_options: HashMap::new(),
        },
        layout: LayoutConfig::default(),
    }
}

fn seed_pending(root: &Path, filename: &str, content: &str) {
    let pending = root.join("raw_data/to_processed");
    fs::create_dir_all(&pending).unwrap();
    fs::write(pending.join(filename), content).unwrap();
}

/// Recursively collect files under a directory, if it exists.
fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

fn item(
    track_id: &str,
    album_id: &str,
    album_artist: &str,
    track_artists: &[&str],
    added_at: &str,
) -> serde_json::Value {
    serde_json::json!({
        "added_at": added_at,
        "track": {
            "id": track_id,
            "name": format!("song {track_id}"),
            "duration_ms": 180000,
            "popularity": 55,
            "external_urls": {"spotify": format!("https://open.spotify.com/track/{track_id}")},
            "album": {
                "id": album_id,
                "name": format!("album {album_id}"),
                "release_date": "2021-08-20",
                "total_tracks": 12,
                "external_urls": {"spotify": format!("https://open.spotify.com/album/{album_id}")},
                "artists": [{"id": album_artist}]
            },
            "artists": track_artists.iter().map(|id| serde_json::json!({
                "id": id,
                "name": format!("artist {id}"),
                "href": format!("https://api.spotify.com/v1/artists/{id}")
            })).collect::<Vec<_>>()
        }
    })
}

fn document(items: Vec<serde_json::Value>) -> String {
    serde_json::json!({ "items": items }).to_string()
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_from_yaml_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
store:
  url: "/data/listening-history"

layout:
  pending_prefix: incoming
  processed_prefix: archived
  document_suffix: .json
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.store.url, "/data/listening-history");
        assert_eq!(config.layout.pending_prefix, "incoming");
        assert_eq!(config.layout.processed_prefix, "archived");
        // Unspecified fields fall back to defaults
        assert_eq!(
            config.layout.output_template,
            "transformed_data/{entity}_data/{entity}_transformed_{timestamp}"
        );
    }

    #[test]
    fn test_config_rejects_template_without_placeholders() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
store:
  url: "/data"

layout:
  output_template: "transformed_data/output"
"#,
        )
        .unwrap();

        assert!(Config::from_file(&config_path).is_err());
    }
}

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_two_items_shared_album() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();

        // Two plays of the same album: one shared artist, one unique
        let doc = document(vec![
            item("t1", "al1", "ar1", &["ar1"], "2024-03-01T08:30:00Z"),
            item("t2", "al1", "ar1", &["ar1", "ar2"], "2024-03-01T09:00:00Z"),
        ]);
        seed_pending(root, "history.json", &doc);

        let summary = run_batch(config_for(root)).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);

        // Source moved from pending to processed, base filename retained
        assert!(!root.join("raw_data/to_processed/history.json").exists());
        assert!(root.join("raw_data/processed/history.json").exists());

        // Three timestamped artifacts, one per entity
        let albums = files_under(&root.join("transformed_data/albums_data"));
        let artists = files_under(&root.join("transformed_data/artists_data"));
        let songs = files_under(&root.join("transformed_data/songs_data"));
        assert_eq!(albums.len(), 1);
        assert_eq!(artists.len(), 1);
        assert_eq!(songs.len(), 1);
        let album_name = albums[0].file_name().unwrap().to_str().unwrap().to_string();
        assert!(album_name.starts_with("albums_transformed_"));

        // Albums deduplicated to one row; artists to two; songs keep both
        let album_csv = fs::read_to_string(&albums[0]).unwrap();
        assert_eq!(album_csv.lines().count(), 2);
        assert_eq!(
            album_csv.lines().next().unwrap(),
            "album_id,name,release_date,total_tracks,url"
        );
        assert!(album_csv.contains("al1"));
        assert!(album_csv.contains("2021-08-20"));

        let artist_csv = fs::read_to_string(&artists[0]).unwrap();
        assert_eq!(artist_csv.lines().count(), 3);
        assert!(artist_csv.contains("ar1"));
        assert!(artist_csv.contains("ar2"));

        let song_csv = fs::read_to_string(&songs[0]).unwrap();
        assert_eq!(song_csv.lines().count(), 3);
        assert_eq!(
            song_csv.lines().next().unwrap(),
            "song_id,song_name,duration_ms,url,popularity,song_added,album_id,artist_id"
        );
    }

    #[tokio::test]
    async fn test_non_document_suffix_is_skipped_silently() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();

        seed_pending(root, "notes.txt", "not a document");
        let doc = document(vec![item(
            "t1",
            "al1",
            "ar1",
            &["ar1"],
            "2024-03-01T08:30:00Z",
        )]);
        seed_pending(root, "history.json", &doc);

        let summary = run_batch(config_for(root)).await.unwrap();

        // Only the .json key is even considered
        assert_eq!(summary.total(), 1);
        assert_eq!(summary.processed, 1);

        // The stray file is left exactly where it was
        assert!(root.join("raw_data/to_processed/notes.txt").exists());
        assert!(!root.join("raw_data/to_processed/history.json").exists());
    }

    #[tokio::test]
    async fn test_empty_source_is_noop() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();

        seed_pending(root, "empty.json", "");

        let summary = run_batch(config_for(root)).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed, 0);

        // No writes, no copy, no delete
        assert!(root.join("raw_data/to_processed/empty.json").exists());
        assert!(!root.join("raw_data/processed").exists());
        assert!(files_under(&root.join("transformed_data")).is_empty());
    }

    #[tokio::test]
    async fn test_empty_listing_is_noop() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let summary = run_batch(config_for(temp_dir.path())).await.unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[tokio::test]
    async fn test_malformed_document_fails_file_and_batch_continues() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();

        seed_pending(root, "bad.json", "{not json at all");
        let doc = document(vec![item(
            "t1",
            "al1",
            "ar1",
            &["ar1"],
            "2024-03-01T08:30:00Z",
        )]);
        seed_pending(root, "good.json", &doc);

        let summary = run_batch(config_for(root)).await.unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "raw_data/to_processed/bad.json");
        assert_eq!(summary.failures[0].1, "decode");

        // The bad file stays pending for the next run; the good one moved
        assert!(root.join("raw_data/to_processed/bad.json").exists());
        assert!(root.join("raw_data/processed/good.json").exists());
    }

    /// A bad `song_added` aborts the whole file with no partial outputs,
    /// while a bad `release_date` would only null one row. The asymmetry
    /// is deliberate, inherited behavior.
    #[tokio::test]
    async fn test_bad_song_added_aborts_file_without_outputs() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();

        let doc = document(vec![
            item("t1", "al1", "ar1", &["ar1"], "2024-03-01T08:30:00Z"),
            item("t2", "al1", "ar1", &["ar1"], "not-a-timestamp"),
        ]);
        seed_pending(root, "history.json", &doc);

        let summary = run_batch(config_for(root)).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].1, "shape");

        // No partial outputs, no deletion of the source
        assert!(root.join("raw_data/to_processed/history.json").exists());
        assert!(!root.join("raw_data/processed").exists());
        assert!(files_under(&root.join("transformed_data")).is_empty());
    }

    #[tokio::test]
    async fn test_bad_release_date_degrades_to_null() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();

        let mut bad_date = item("t1", "al1", "ar1", &["ar1"], "2024-03-01T08:30:00Z");
        bad_date["track"]["album"]["release_date"] = serde_json::json!("2021");
        seed_pending(root, "history.json", &document(vec![bad_date]));

        let summary = run_batch(config_for(root)).await.unwrap();
        assert_eq!(summary.processed, 1);

        let albums = files_under(&root.join("transformed_data/albums_data"));
        let album_csv = fs::read_to_string(&albums[0]).unwrap();
        let row = album_csv.lines().nth(1).unwrap();
        // release_date field is empty for the unparseable row
        assert!(row.contains("al1,album al1,,12,"));
    }

    #[tokio::test]
    async fn test_reprocessing_after_failure_is_safe() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path();

        seed_pending(root, "bad.json", "{broken");
        let summary = run_batch(config_for(root)).await.unwrap();
        assert_eq!(summary.failed, 1);

        // Fix the payload in place; the next run picks it up again
        let doc = document(vec![item(
            "t1",
            "al1",
            "ar1",
            &["ar1"],
            "2024-03-01T08:30:00Z",
        )]);
        seed_pending(root, "bad.json", &doc);

        let summary = run_batch(config_for(root)).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert!(root.join("raw_data/processed/bad.json").exists());
    }
}
