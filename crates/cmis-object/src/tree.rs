//! Recursive folder deletion.
//!
//! Descendants are processed depth first and a folder is only deleted once
//! every object filed in it is gone. Per-object failures become entries of
//! the [`TreeDeletionReport`], never errors.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use cmis_transport::TreeNode;
use cmis_types::{ObjectId, UnfileObject};

use crate::error::{ObjectError, ObjectResult};

/// Objects that remain after a tree deletion, in the order they were found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeDeletionReport {
    pub not_deleted: Vec<ObjectId>,
}

impl TreeDeletionReport {
    /// `true` when the whole tree, root folder included, was removed.
    pub fn is_complete(&self) -> bool {
        self.not_deleted.is_empty()
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.not_deleted.contains(object_id)
    }
}

/// What to do with the descendants of one folder.
pub(crate) struct TreePlan {
    pub folder_id: ObjectId,
    pub children: Vec<TreeNode>,
    pub unfile_objects: UnfileObject,
    pub continue_on_failure: bool,
}

/// Run `plan`, deleting through `delete` and unfiling through `unfile`.
pub(crate) fn execute<D, U>(plan: TreePlan, delete: D, unfile: U) -> TreeDeletionReport
where
    D: FnMut(&ObjectId) -> ObjectResult<()>,
    U: FnMut(&ObjectId, &ObjectId) -> ObjectResult<()>,
{
    let mut tree_folders = HashSet::from([plan.folder_id.clone()]);
    collect_folders(&plan.children, &mut tree_folders);

    let mut run = Execution {
        delete,
        unfile,
        tree_folders,
        unfile_objects: plan.unfile_objects,
        continue_on_failure: plan.continue_on_failure,
        removed: HashSet::new(),
        unfiled: HashSet::new(),
        not_deleted: Vec::new(),
        stopped: false,
    };

    let emptied = run.visit_children(&plan.children, &plan.folder_id);
    if emptied {
        run.remove(&plan.folder_id);
    } else {
        run.report(&plan.folder_id);
    }

    let report = TreeDeletionReport {
        not_deleted: run.not_deleted,
    };
    info!(
        folder = %plan.folder_id,
        removed = run.removed.len(),
        not_deleted = report.not_deleted.len(),
        "tree deletion finished"
    );
    report
}

fn collect_folders(nodes: &[TreeNode], folders: &mut HashSet<ObjectId>) {
    for node in nodes.iter().filter(|n| n.is_folder()) {
        folders.insert(node.object_id.clone());
        collect_folders(&node.children, folders);
    }
}

struct Execution<D, U> {
    delete: D,
    unfile: U,
    /// The root folder and every folder beneath it.
    tree_folders: HashSet<ObjectId>,
    unfile_objects: UnfileObject,
    continue_on_failure: bool,
    removed: HashSet<ObjectId>,
    unfiled: HashSet<(ObjectId, ObjectId)>,
    not_deleted: Vec<ObjectId>,
    stopped: bool,
}

impl<D, U> Execution<D, U>
where
    D: FnMut(&ObjectId) -> ObjectResult<()>,
    U: FnMut(&ObjectId, &ObjectId) -> ObjectResult<()>,
{
    /// Returns `true` if every child is gone from `parent`.
    fn visit_children(&mut self, children: &[TreeNode], parent: &ObjectId) -> bool {
        let mut emptied = true;
        for child in children {
            if !self.visit(child, parent) {
                emptied = false;
            }
        }
        emptied
    }

    /// Returns `true` if `node` is gone from `parent`.
    fn visit(&mut self, node: &TreeNode, parent: &ObjectId) -> bool {
        if self.stopped {
            return false;
        }
        if node.is_folder() {
            if !self.visit_children(&node.children, &node.object_id) {
                self.report(&node.object_id);
                return false;
            }
            return self.remove(&node.object_id);
        }

        let unfile = match self.unfile_objects {
            UnfileObject::Delete => false,
            // kept only when it stays filed somewhere outside the tree
            UnfileObject::DeleteSingleFiled => node
                .parent_ids
                .iter()
                .any(|p| !self.tree_folders.contains(p)),
            UnfileObject::Unfile => true,
        };
        if unfile {
            self.unfile_from(&node.object_id, parent)
        } else {
            self.remove(&node.object_id)
        }
    }

    fn remove(&mut self, id: &ObjectId) -> bool {
        if self.stopped {
            return false;
        }
        if self.removed.contains(id) {
            return true;
        }
        match (self.delete)(id) {
            Ok(()) => {}
            Err(ObjectError::ObjectNotFound(_)) => {
                debug!(object = %id, "already removed");
            }
            Err(err) => {
                self.fail(id, &err);
                return false;
            }
        }
        self.removed.insert(id.clone());
        true
    }

    fn unfile_from(&mut self, id: &ObjectId, folder: &ObjectId) -> bool {
        if self.removed.contains(id) || self.unfiled.contains(&(id.clone(), folder.clone())) {
            return true;
        }
        match (self.unfile)(id, folder) {
            Ok(()) => {}
            Err(ObjectError::ObjectNotFound(_)) => {
                debug!(object = %id, "already removed");
            }
            Err(err) => {
                self.fail(id, &err);
                return false;
            }
        }
        self.unfiled.insert((id.clone(), folder.clone()));
        true
    }

    fn fail(&mut self, id: &ObjectId, err: &ObjectError) {
        warn!(object = %id, error = %err, "tree member not deleted");
        self.report(id);
        if !self.continue_on_failure {
            self.stopped = true;
        }
    }

    fn report(&mut self, id: &ObjectId) {
        if !self.not_deleted.contains(id) {
            self.not_deleted.push(id.clone());
        }
    }
}
