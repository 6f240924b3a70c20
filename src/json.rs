use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

pub const INDEX_FILE_NAME: &str = "modrinth.index.json";

/// `modrinth.index.json`, the manifest at the root of every `.mrpack`.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexJson {
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub format_version: u32,
    #[serde(default)]
    pub version_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub files: Vec<FileJson>,
    /// Dependency id (`minecraft`, `fabric-loader`, ...) to version.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileJson {
    pub path: String,
    #[serde(default)]
    pub hashes: HashesJson,
    #[serde(default)]
    pub env: Option<EnvJson>,
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashesJson {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
    /// Any further algorithms, kept as raw JSON since nothing checks them.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvJson {
    pub client: EnvSupport,
    pub server: EnvSupport,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvSupport {
    Required,
    Optional,
    Unsupported,
}

/// Which kind of installation the pack is being unpacked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    /// Name of the side-specific overrides folder inside the pack.
    pub fn overrides_dir(self) -> &'static str {
        match self {
            Side::Client => "client-overrides",
            Side::Server => "server-overrides",
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Side::Client),
            "server" => Ok(Side::Server),
            other => Err(format!("unknown side '{}', expected 'client' or 'server'", other)),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => f.write_str("client"),
            Side::Server => f.write_str("server"),
        }
    }
}

impl FileJson {
    pub fn file_name(&self) -> &str {
        crate::utils::base_name(&self.path)
    }

    /// Whether this entry should be installed for `side`. Entries without env info are always
    /// wanted, as is everything when no side is configured.
    pub fn is_wanted(&self, side: Option<Side>) -> bool {
        match (side, &self.env) {
            (Some(Side::Client), Some(env)) => env.client != EnvSupport::Unsupported,
            (Some(Side::Server), Some(env)) => env.server != EnvSupport::Unsupported,
            _ => true,
        }
    }
}

/// Reads the index from the root of an extracted pack. A missing index is not an error.
pub async fn read_index(pack_dir: &Path) -> anyhow::Result<Option<IndexJson>> {
    let index_path = pack_dir.join(INDEX_FILE_NAME);
    if !fs::try_exists(&index_path).await.unwrap_or(false) {
        return Ok(None);
    }

    let index_str = fs::read_to_string(&index_path)
        .await
        .with_context(|| format!("Error reading {}", index_path.to_string_lossy()))?;
    let index: IndexJson =
        serde_json::from_str(&index_str).context("Error parsing modrinth.index.json")?;

    Ok(Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "game": "minecraft",
        "formatVersion": 1,
        "versionId": "1.2.0",
        "name": "Example Pack",
        "summary": "Just an example",
        "files": [
            {
                "path": "mods/x.jar",
                "hashes": { "sha1": "aa", "sha512": "bb" },
                "env": { "client": "required", "server": "unsupported" },
                "downloads": ["https://cdn.modrinth.com/x.jar", "https://mirror/x.jar"],
                "fileSize": 1234,
                "somethingNew": true
            },
            { "path": "mods/y.jar", "downloads": [] }
        ],
        "dependencies": { "minecraft": "1.20.1", "fabric-loader": "0.14.21" }
    }"#;

    #[test]
    fn parses_full_index() {
        let index: IndexJson = serde_json::from_str(INDEX).unwrap();

        assert_eq!(index.game, "minecraft");
        assert_eq!(index.format_version, 1);
        assert_eq!(index.name, "Example Pack");
        assert_eq!(index.files.len(), 2);
        assert_eq!(index.dependencies["fabric-loader"], "0.14.21");

        let x = &index.files[0];
        assert_eq!(x.file_name(), "x.jar");
        assert_eq!(x.hashes.sha512.as_deref(), Some("bb"));
        assert_eq!(x.downloads[0], "https://cdn.modrinth.com/x.jar");
        assert_eq!(x.file_size, 1234);
        assert_eq!(x.env.as_ref().unwrap().server, EnvSupport::Unsupported);

        let y = &index.files[1];
        assert!(y.downloads.is_empty());
        assert!(y.env.is_none());
    }

    #[test]
    fn unknown_hash_fields_of_any_shape_are_tolerated() {
        let file: FileJson = serde_json::from_str(
            r#"{
                "path": "mods/z.jar",
                "hashes": { "sha1": "aa", "sha512": "bb", "murmur2": 12345, "extra": { "a": [1] } },
                "downloads": []
            }"#,
        )
        .unwrap();

        assert_eq!(file.hashes.sha512.as_deref(), Some("bb"));
        assert_eq!(file.hashes.other["murmur2"], serde_json::json!(12345));
        assert!(file.hashes.other.contains_key("extra"));
    }

    #[test]
    fn side_filter_only_drops_unsupported() {
        let index: IndexJson = serde_json::from_str(INDEX).unwrap();
        let x = &index.files[0];
        let y = &index.files[1];

        assert!(x.is_wanted(None));
        assert!(x.is_wanted(Some(Side::Client)));
        assert!(!x.is_wanted(Some(Side::Server)));
        assert!(y.is_wanted(Some(Side::Server)));
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("Client".parse::<Side>(), Ok(Side::Client));
        assert_eq!("server".parse::<Side>(), Ok(Side::Server));
        assert!("both".parse::<Side>().is_err());
    }

    #[tokio::test]
    async fn missing_index_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_index(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE_NAME), "{ not json").unwrap();
        assert!(read_index(dir.path()).await.is_err());
    }
}
