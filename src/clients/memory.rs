//! In-memory object store for tests.
//!
//! Behaves like the git data API closely enough to check tree contents and ref
//! placement: writes that reference unknown objects are rejected, and creating
//! an existing ref fails.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;

use super::github::ObjectStoreOps;
use super::github_curl::ApiError;
use crate::objects::BlobId;
use crate::objects::CommitId;
use crate::objects::TreeEntry;
use crate::objects::TreeId;

#[derive(Default)]
struct State {
    blobs: HashMap<BlobId, String>,
    trees: HashMap<TreeId, BTreeMap<String, BlobId>>,
    commits: HashMap<CommitId, (TreeId, Vec<CommitId>)>,
    refs: BTreeMap<String, CommitId>,
    calls: Vec<String>,
    next_id: usize,
}

impl State {
    fn next_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{}{}", kind, self.next_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn rejected(message: impl Into<String>) -> ApiError {
    ApiError::Status {
        status: 422,
        message: message.into(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root commit holding `files`.
    pub fn seed_commit(&self, files: &[(&str, &str)]) -> CommitId {
        let mut state = self.state.lock().unwrap();
        let mut tree = BTreeMap::new();
        for (path, content) in files {
            let blob = BlobId(state.next_id("blob"));
            state.blobs.insert(blob.clone(), content.to_string());
            tree.insert(path.to_string(), blob);
        }
        let tree_id = TreeId(state.next_id("tree"));
        state.trees.insert(tree_id.clone(), tree);
        let commit = CommitId(state.next_id("commit"));
        state.commits.insert(commit.clone(), (tree_id, vec![]));
        commit
    }

    pub fn set_ref(&self, branch: &str, commit: &CommitId) {
        let mut state = self.state.lock().unwrap();
        state.refs.insert(branch.to_string(), commit.clone());
    }

    pub fn ref_target(&self, branch: &str) -> Option<CommitId> {
        self.state.lock().unwrap().refs.get(branch).cloned()
    }

    pub fn parents(&self, commit: &CommitId) -> Vec<CommitId> {
        let state = self.state.lock().unwrap();
        state.commits[commit].1.clone()
    }

    /// Path to contents of every file in a commit's tree.
    pub fn files(&self, commit: &CommitId) -> BTreeMap<String, String> {
        let state = self.state.lock().unwrap();
        let (tree, _) = &state.commits[commit];
        state.trees[tree]
            .iter()
            .map(|(path, blob)| (path.clone(), state.blobs[blob].clone()))
            .collect()
    }

    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits.len()
    }

    /// Names of the write operations issued so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl ObjectStoreOps for MemoryStore {
    async fn get_ref(&self, branch: &str) -> Result<CommitId, ApiError> {
        let state = self.state.lock().unwrap();
        state
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("heads/{}", branch)))
    }

    async fn create_ref(&self, branch: &str, commit: &CommitId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_ref {}", branch));
        if state.refs.contains_key(branch) {
            return Err(rejected("Reference already exists"));
        }
        if !state.commits.contains_key(commit) {
            return Err(rejected("Object does not exist"));
        }
        state.refs.insert(branch.to_string(), commit.clone());
        Ok(())
    }

    async fn delete_ref(&self, branch: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_ref {}", branch));
        match state.refs.remove(branch) {
            Some(_) => Ok(()),
            None => Err(rejected("Reference does not exist")),
        }
    }

    async fn update_ref(&self, branch: &str, commit: &CommitId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update_ref {}", branch));
        if !state.commits.contains_key(commit) {
            return Err(rejected("Object does not exist"));
        }
        match state.refs.get_mut(branch) {
            Some(target) => {
                *target = commit.clone();
                Ok(())
            }
            None => Err(rejected("Reference does not exist")),
        }
    }

    async fn get_commit_tree(&self, commit: &CommitId) -> Result<TreeId, ApiError> {
        let state = self.state.lock().unwrap();
        state
            .commits
            .get(commit)
            .map(|(tree, _)| tree.clone())
            .ok_or_else(|| ApiError::NotFound(commit.to_string()))
    }

    async fn create_blob(&self, content: &str) -> Result<BlobId, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_blob".to_string());
        let blob = BlobId(state.next_id("blob"));
        state.blobs.insert(blob.clone(), content.to_string());
        Ok(blob)
    }

    async fn create_tree(
        &self,
        base_tree: &TreeId,
        entries: &[TreeEntry],
    ) -> Result<TreeId, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_tree".to_string());
        let mut tree = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| rejected("base_tree does not exist"))?;
        for entry in entries {
            match &entry.blob {
                Some(blob) if !state.blobs.contains_key(blob) => {
                    return Err(rejected(format!("blob {} does not exist", blob)));
                }
                Some(blob) => {
                    tree.insert(entry.path.clone(), blob.clone());
                }
                None => {
                    tree.remove(&entry.path);
                }
            }
        }
        let tree_id = TreeId(state.next_id("tree"));
        state.trees.insert(tree_id.clone(), tree);
        Ok(tree_id)
    }

    async fn create_commit(
        &self,
        _message: &str,
        tree: &TreeId,
        parents: &[CommitId],
    ) -> Result<CommitId, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("create_commit".to_string());
        if !state.trees.contains_key(tree) {
            return Err(rejected("tree does not exist"));
        }
        if let Some(parent) = parents.iter().find(|p| !state.commits.contains_key(*p)) {
            return Err(rejected(format!("parent {} does not exist", parent)));
        }
        let commit = CommitId(state.next_id("commit"));
        state
            .commits
            .insert(commit.clone(), (tree.clone(), parents.to_vec()));
        Ok(commit)
    }
}
