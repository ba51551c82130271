use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::forms::CommentForm;
use crate::models::Comment;

#[derive(Debug, Clone)]
struct Node {
    comment: Comment,
    parent: Option<String>,
    children: Vec<String>,
}

/// A post's comment forest as an arena keyed by id. Parent identity always
/// comes from the server, so the structure stays a forest.
#[derive(Debug, Clone, Default)]
pub struct CommentTree {
    roots: Vec<String>,
    nodes: HashMap<String, Node>,
}

impl CommentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the nested shape the API returns. Flat lists that only
    /// carry `parent_id` are linked up as well; a `parent_id` that points
    /// at an unknown comment makes that comment a root.
    pub fn from_forest(forest: Vec<Comment>) -> Self {
        let mut flat: Vec<(Comment, Option<String>)> = Vec::new();
        let mut stack: Vec<(Comment, Option<String>)> =
            forest.into_iter().rev().map(|c| (c, None)).collect();
        while let Some((mut comment, nested_parent)) = stack.pop() {
            let replies = std::mem::take(&mut comment.replies);
            for reply in replies.into_iter().rev() {
                stack.push((reply, Some(comment.id.clone())));
            }
            flat.push((comment, nested_parent));
        }

        let known: HashSet<String> = flat.iter().map(|(c, _)| c.id.clone()).collect();
        let mut tree = CommentTree::new();
        let mut order = Vec::with_capacity(flat.len());
        for (comment, nested_parent) in flat {
            if tree.nodes.contains_key(&comment.id) {
                tracing::warn!("Duplicate comment {} in thread, ignoring", comment.id);
                continue;
            }
            let parent = nested_parent.or_else(|| {
                comment
                    .parent_id
                    .clone()
                    .filter(|p| known.contains(p) && *p != comment.id)
            });
            order.push(comment.id.clone());
            tree.nodes.insert(
                comment.id.clone(),
                Node {
                    comment,
                    parent,
                    children: Vec::new(),
                },
            );
        }

        tree.link(order);
        tree
    }

    /// Wire children lists from parent links, keeping server order and
    /// breaking any cycle a malformed flat payload could introduce.
    fn link(&mut self, order: Vec<String>) {
        for id in &order {
            if self.reaches_itself(id) {
                tracing::warn!("Comment {} is part of a parent cycle, making it a root", id);
                if let Some(node) = self.nodes.get_mut(id) {
                    node.parent = None;
                }
            }
        }

        for id in order {
            match self.nodes[&id].parent.clone() {
                Some(parent) => {
                    if let Some(node) = self.nodes.get_mut(&parent) {
                        node.children.push(id);
                    }
                }
                None => self.roots.push(id),
            }
        }
    }

    fn reaches_itself(&self, id: &str) -> bool {
        let mut current = self.nodes.get(id).and_then(|n| n.parent.clone());
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == id || steps > self.nodes.len() {
                return true;
            }
            steps += 1;
            current = self.nodes.get(&parent).and_then(|n| n.parent.clone());
        }
        false
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Comment> {
        self.nodes.get(id).map(|n| &n.comment)
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id)?.parent.as_deref()
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Add a top-level comment at the front of the list.
    pub fn insert_root(&mut self, mut comment: Comment) -> bool {
        if self.nodes.contains_key(&comment.id) {
            return false;
        }
        comment.replies.clear();
        comment.parent_id = None;
        self.roots.insert(0, comment.id.clone());
        self.nodes.insert(
            comment.id.clone(),
            Node {
                comment,
                parent: None,
                children: Vec::new(),
            },
        );
        true
    }

    /// Append a reply under `parent_id`. Returns false when the parent is
    /// not in the tree or the id is already taken.
    pub fn insert_reply(&mut self, parent_id: &str, mut comment: Comment) -> bool {
        if self.nodes.contains_key(&comment.id) {
            return false;
        }
        let Some(parent) = self.nodes.get_mut(parent_id) else {
            return false;
        };
        parent.children.push(comment.id.clone());

        comment.replies.clear();
        comment.parent_id = Some(parent_id.to_string());
        self.nodes.insert(
            comment.id.clone(),
            Node {
                comment,
                parent: Some(parent_id.to_string()),
                children: Vec::new(),
            },
        );
        true
    }

    /// Remove a comment and its whole subtree. Returns the removed ids,
    /// the comment itself first.
    pub fn remove(&mut self, id: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };

        match node.parent.clone() {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children.into_iter().rev());
                removed.push(current);
            }
        }
        removed
    }

    /// Pre-order walk with depth, roots at depth 0.
    pub fn walk(&self) -> Vec<(usize, &Comment)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, &str)> =
            self.roots.iter().rev().map(|id| (0, id.as_str())).collect();
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push((depth, &node.comment));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child.as_str()));
            }
        }
        out
    }

    /// The nested shape, each comment's `replies` holding its direct
    /// children.
    pub fn to_forest(&self) -> Vec<Comment> {
        self.roots.iter().filter_map(|id| self.nested(id)).collect()
    }

    fn nested(&self, id: &str) -> Option<Comment> {
        let node = self.nodes.get(id)?;
        let mut comment = node.comment.clone();
        comment.replies = node
            .children
            .iter()
            .filter_map(|child| self.nested(child))
            .collect();
        Some(comment)
    }
}

/// Comment endpoints used by [`CommentThread`].
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn list(&self, post_id: &str) -> ClientResult<Vec<Comment>>;
    async fn create(&self, post_id: &str, form: &CommentForm) -> ClientResult<Comment>;
    async fn remove(&self, comment_id: &str) -> ClientResult<()>;
}

#[async_trait]
impl CommentSource for ApiClient {
    async fn list(&self, post_id: &str) -> ClientResult<Vec<Comment>> {
        self.post_comments(post_id).await
    }

    async fn create(&self, post_id: &str, form: &CommentForm) -> ClientResult<Comment> {
        self.create_comment(post_id, form).await
    }

    async fn remove(&self, comment_id: &str) -> ClientResult<()> {
        self.delete_comment(comment_id).await
    }
}

/// The comment thread of one post. Falls back to a full reload whenever
/// the local shape cannot be trusted.
pub struct CommentThread<'a> {
    source: &'a dyn CommentSource,
    post_id: String,
    tree: CommentTree,
    author_fallback: Option<String>,
}

impl<'a> CommentThread<'a> {
    /// Fetch the full tree for a post.
    pub async fn load(
        source: &'a dyn CommentSource,
        post_id: &str,
        author_fallback: Option<String>,
    ) -> ClientResult<CommentThread<'a>> {
        let forest = source.list(post_id).await?;
        Ok(Self {
            source,
            post_id: post_id.to_string(),
            tree: CommentTree::from_forest(forest),
            author_fallback,
        })
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn tree(&self) -> &CommentTree {
        &self.tree
    }

    /// Replace the local tree with the server's.
    pub async fn reload(&mut self) -> ClientResult<()> {
        let forest = self.source.list(&self.post_id).await?;
        self.tree = CommentTree::from_forest(forest);
        Ok(())
    }

    fn fill_author(&self, comment: &mut Comment) {
        if comment.author.trim().is_empty() {
            comment.author = self
                .author_fallback
                .clone()
                .unwrap_or_else(|| "you".to_string());
        }
    }

    /// Post a top-level comment and put it first.
    pub async fn create_root(&mut self, content: &str) -> ClientResult<String> {
        let form = CommentForm::new(content, None);
        form.validate()?;

        let mut created = self.source.create(&self.post_id, &form).await?;
        self.fill_author(&mut created);
        let id = created.id.clone();
        if !self.tree.insert_root(created) {
            self.reload().await?;
        }
        Ok(id)
    }

    /// Reply under `parent_id`. When the server placed the reply somewhere
    /// this tree cannot mirror, the whole thread is reloaded.
    pub async fn reply(&mut self, parent_id: &str, content: &str) -> ClientResult<String> {
        let form = CommentForm::new(content, Some(parent_id));
        form.validate()?;

        let mut created = self.source.create(&self.post_id, &form).await?;
        self.fill_author(&mut created);
        let id = created.id.clone();

        let placed_as_asked = created
            .parent_id
            .as_deref()
            .map_or(true, |p| p == parent_id);
        if !placed_as_asked || !self.tree.insert_reply(parent_id, created) {
            tracing::debug!("Reply {} not placed locally, reloading thread", id);
            self.reload().await?;
        }
        Ok(id)
    }

    /// Remove a comment and its replies. If the server refuses, the thread
    /// is reloaded so the local shape matches again, and the error is
    /// returned.
    pub async fn delete(&mut self, comment_id: &str) -> ClientResult<usize> {
        let removed = self.tree.remove(comment_id);
        match self.source.remove(comment_id).await {
            Ok(()) => Ok(removed.len()),
            Err(e) => {
                tracing::warn!("Deleting comment {} failed: {}", comment_id, e);
                if let Err(reload_err) = self.reload().await {
                    tracing::warn!("Reload after failed delete also failed: {}", reload_err);
                }
                Err(e)
            }
        }
    }
}
