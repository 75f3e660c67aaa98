//! In-memory port implementations shared by unit tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::ports::{
    Clock, CompletionFuture, CompletionRequest, CompletionResponse, DirEntry, Embedder,
    EmbeddingFuture, EmbeddingRequest, EntryKind, FileSystem, LlmClient,
};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { size: u64, contents: String },
    Symlink(Option<PathBuf>),
}

/// In-memory filesystem for exercising the scanner without touching disk.
pub struct MemFs {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    denied: Mutex<Vec<PathBuf>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self { nodes: Mutex::new(BTreeMap::new()), denied: Mutex::new(Vec::new()) }
    }

    fn insert_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    pub fn add_file(&self, path: &str, size: u64) {
        let path = PathBuf::from(path);
        let mut nodes = self.nodes.lock().unwrap();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(path, Node::File { size, contents: String::new() });
    }

    pub fn add_dir(&self, path: &str) {
        let path = PathBuf::from(path);
        let mut nodes = self.nodes.lock().unwrap();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(path, Node::Dir);
    }

    pub fn add_symlink(&self, path: &str) {
        self.insert_symlink(path, None);
    }

    pub fn add_link(&self, path: &str, target: &str) {
        self.insert_symlink(path, Some(PathBuf::from(target)));
    }

    fn insert_symlink(&self, path: &str, target: Option<PathBuf>) {
        let path = PathBuf::from(path);
        let mut nodes = self.nodes.lock().unwrap();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(path, Node::Symlink(target));
    }

    pub fn deny(&self, path: &str) {
        self.denied.lock().unwrap().push(PathBuf::from(path));
    }
}

impl FileSystem for MemFs {
    fn entry_kind(&self, path: &Path) -> Result<EntryKind, Box<dyn std::error::Error + Send + Sync>> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(Node::Dir) => Ok(EntryKind::Directory),
            Some(Node::File { size, .. }) => Ok(EntryKind::File { size: *size }),
            Some(Node::Symlink(_)) => Ok(EntryKind::Symlink),
            None => Err(format!("not found: {}", path.display()).into()),
        }
    }

    fn canonicalize(
        &self,
        path: &Path,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some(Node::Symlink(Some(target))) if nodes.contains_key(target) => Ok(target.clone()),
            Some(Node::Symlink(_)) | None => Err(format!("not found: {}", path.display()).into()),
            Some(_) => Ok(path.to_path_buf()),
        }
    }

    fn read_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<DirEntry>, Box<dyn std::error::Error + Send + Sync>> {
        if self.denied.lock().unwrap().iter().any(|d| d == path) {
            return Err(format!("permission denied: {}", path.display()).into());
        }
        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(format!("not a directory: {}", path.display()).into());
        }
        let mut entries: Vec<DirEntry> = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, node)| DirEntry {
                name: p.file_name().unwrap().to_string_lossy().into_owned(),
                kind: match node {
                    Node::Dir => EntryKind::Directory,
                    Node::File { size, .. } => EntryKind::File { size: *size },
                    Node::Symlink(_) => EntryKind::Symlink,
                },
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File { contents, .. }) => Ok(contents.clone()),
            _ => Err(format!("File not found: {}", path.display()).into()),
        }
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut nodes = self.nodes.lock().unwrap();
        Self::insert_parents(&mut nodes, path);
        nodes.insert(
            path.to_path_buf(),
            Node::File { size: contents.len() as u64, contents: contents.to_string() },
        );
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes.lock().unwrap().contains_key(path)
    }
}

/// Clock that returns a fixed instant, advancing one minute per call.
pub struct FixedClock {
    start: DateTime<Utc>,
    calls: AtomicUsize,
}

impl FixedClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { start, calls: AtomicUsize::new(0) }
    }

    pub fn epoch() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::minutes(i64::try_from(n).unwrap())
    }
}

/// Embeds text as a 16-bucket byte histogram; optionally always fails.
pub struct HistogramEmbedder {
    fail: Arc<AtomicBool>,
    pub calls: AtomicUsize,
}

impl HistogramEmbedder {
    pub fn working() -> Self {
        Self { fail: Arc::new(AtomicBool::new(false)), calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { fail: Arc::new(AtomicBool::new(true)), calls: AtomicUsize::new(0) }
    }

    /// Shared flag that takes the embedder offline while set.
    pub fn failure_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail)
    }
}

pub fn histogram(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; 16];
    for byte in text.bytes() {
        vector[usize::from(byte) % 16] += 1.0;
    }
    vector
}

impl Embedder for HistogramEmbedder {
    fn embed(&self, request: &EmbeddingRequest) -> EmbeddingFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = request.text.clone();
        let fail = self.fail.load(Ordering::SeqCst);
        Box::pin(async move {
            if fail {
                Err("embedding backend offline".into())
            } else {
                Ok(histogram(&text))
            }
        })
    }
}

/// Text model stub returning a canned answer, failing, or never answering.
pub enum StubLlm {
    Answer(String),
    Fail,
    Hang,
}

impl LlmClient for StubLlm {
    fn complete(&self, _request: &CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(async move {
            match self {
                StubLlm::Answer(text) => {
                    Ok(CompletionResponse { text: text.clone(), prompt_tokens: 1, completion_tokens: 1 })
                }
                StubLlm::Fail => Err("connection refused".into()),
                StubLlm::Hang => {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    Err("unreachable".into())
                }
            }
        })
    }
}
