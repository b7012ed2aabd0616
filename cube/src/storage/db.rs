//! # CubeDb: Scoped Access to the Backing Store
//!
//! The backing store is an embedded sled database. sled organizes data into
//! named "trees", which play the role of tables here: one `position` tree, one
//! internal `__cell_index` tree, and one tree per attribute.
//!
//! ## Connections
//!
//! A [`CubeDb`] never holds the store open between operations. Each operation
//! calls [`CubeDb::connect`] and receives a [`Connection`] guard; dropping the
//! guard flushes pending writes and releases the database, on success and
//! error paths alike. The store directory is therefore the durable owner of
//! all data, and a `CubeDb` is only a handle naming it.
//!
//! Temporary stores (used by tests) live in memory and are shared by cloning
//! the sled handle instead of reopening a path.

use std::path::{Path, PathBuf};

use sled::{Db, Tree};

use super::schema::AttributeName;
use crate::config::{CELL_INDEX_TABLE, POSITION_TABLE};
use crate::error::CubeResult;

#[derive(Debug, Clone)]
enum Backend {
    Disk(PathBuf),
    Temporary(Db),
}

/// Handle naming a backing store.
#[derive(Debug, Clone)]
pub struct CubeDb {
    backend: Backend,
}

impl CubeDb {
    /// A store at `path`. Nothing is opened until the first operation; the
    /// directory is created then if it does not exist.
    pub fn at_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            backend: Backend::Disk(path.as_ref().to_path_buf()),
        }
    }

    /// An in-memory store that disappears when the last handle is dropped.
    pub fn open_temporary() -> CubeResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            backend: Backend::Temporary(db),
        })
    }

    /// Filesystem location of the store, or `None` for a temporary store.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Disk(path) => Some(path),
            Backend::Temporary(_) => None,
        }
    }

    /// Acquire a connection for the duration of one operation.
    pub fn connect(&self) -> CubeResult<Connection> {
        let db = match &self.backend {
            Backend::Disk(path) => sled::open(path)?,
            Backend::Temporary(db) => db.clone(),
        };
        Ok(Connection { db })
    }
}

/// A live connection to the store. Released when dropped.
pub struct Connection {
    db: Db,
}

impl Connection {
    /// The `position` table.
    pub fn positions(&self) -> CubeResult<Tree> {
        Ok(self.db.open_tree(POSITION_TABLE)?)
    }

    /// The internal `(inline, crline, twt) -> id` index.
    pub fn cell_index(&self) -> CubeResult<Tree> {
        Ok(self.db.open_tree(CELL_INDEX_TABLE)?)
    }

    /// Names of every table in the store, internal ones included.
    pub fn table_names(&self) -> Vec<String> {
        self.db
            .tree_names()
            .iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.db
            .tree_names()
            .iter()
            .any(|existing| existing.as_ref() == name.as_bytes())
    }

    /// An existing attribute table, or `None`. Never creates the table.
    pub fn attribute_table(&self, name: &AttributeName) -> CubeResult<Option<Tree>> {
        if name.is_reserved() || !self.has_table(name.as_str()) {
            return Ok(None);
        }
        Ok(Some(self.db.open_tree(name.as_str())?))
    }

    /// Create (or open) the table for `name`.
    pub fn create_table(&self, name: &AttributeName) -> CubeResult<Tree> {
        Ok(self.db.open_tree(name.as_str())?)
    }

    /// Drop the table for `name`. Returns whether it existed.
    pub fn drop_table(&self, name: &AttributeName) -> CubeResult<bool> {
        Ok(self.db.drop_tree(name.as_str())?)
    }

    /// A fresh, unique cell id.
    pub fn generate_id(&self) -> CubeResult<u64> {
        Ok(self.db.generate_id()?)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            tracing::warn!(error = %e, "flush on connection release failed");
        }
    }
}
