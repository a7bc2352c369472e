// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The on-disk module table.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::services::command::ModuleDetails;

const TABLE_FILE: &str = "localModuleTable.sqlite3";

/// A module-table row: identity plus where to reach the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTableRow {
    /// The module's identity.
    pub details: ModuleDetails,
    /// The module's `ipc://` command endpoint.
    pub ipc_path: String,
}

/// Maps module names to IPC command endpoints.
///
/// The table lives in `localModuleTable.sqlite3` under an
/// installation-configured directory. Rows are advisory: a module that
/// died without cleaning up leaves a stale row, and clients treat a
/// failed connect as "not actually there".
pub struct ModuleTable {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl ModuleTable {
    /// Opens (creating if needed) the table under the given directory.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;
        let path = directory.join(TABLE_FILE);
        let conn = Connection::open(&path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS modules (
                module TEXT PRIMARY KEY,
                executable TEXT NOT NULL,
                instance INTEGER NOT NULL,
                pid INTEGER NOT NULL,
                ppid INTEGER NOT NULL,
                machine TEXT NOT NULL,
                ipc_path TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// The table file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds or replaces a module's row.
    pub fn add_module(&self, details: &ModuleDetails, ipc_path: &str) -> Result<()> {
        if details.name().is_empty() {
            return Err(Error::InvalidArgument("module name not set".into()));
        }
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO modules
                 (module, executable, instance, pid, ppid, machine, ipc_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                details.name(),
                details.executable(),
                i64::from(details.instance()),
                details.process_identifier(),
                details.parent_process_identifier(),
                details.machine(),
                ipc_path,
            ],
        )?;
        Ok(())
    }

    /// Removes a module's row.
    pub fn remove_module(&self, name: &str) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM modules WHERE module = ?1", [name])?;
        Ok(())
    }

    /// The IPC endpoint registered for a module, if any.
    pub fn ipc_path(&self, name: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let path = conn
            .query_row(
                "SELECT ipc_path FROM modules WHERE module = ?1",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(path)
    }

    /// Every registered row, ordered by module name.
    pub fn rows(&self) -> Result<Vec<ModuleTableRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT module, executable, instance, pid, ppid, machine, ipc_path
             FROM modules ORDER BY module",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let mut result = Vec::with_capacity(rows.len());
        for (module, executable, instance, pid, ppid, machine, ipc_path) in rows {
            let mut details = ModuleDetails::new();
            details.set_name(&module)?;
            details.set_executable(&executable);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            details.set_instance(instance.clamp(0, i64::from(u16::MAX)) as u16);
            details.set_process_identifier(pid);
            details.set_parent_process_identifier(ppid);
            details.set_machine(&machine);
            result.push(ModuleTableRow { details, ipc_path });
        }
        Ok(result)
    }
}
