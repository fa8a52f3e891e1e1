//! File create, open and close.

use crate::connector::Connector;
use crate::error::{VolError, VolErrorExt};
use crate::record::AccessConfig;
use stratum_domain::config::OpenFlagsPolicy;
use stratum_domain::{AccessFlags, ObjectId, PlistId};
use tracing::{debug, instrument, warn};

impl Connector {
    /// Creates a native file through `access`, which then stands for the open file.
    #[instrument(level = "debug", skip(self, access), fields(connector = %self.id()))]
    pub fn file_create(
        &self,
        access: &mut AccessConfig,
        path: &str,
        flags: AccessFlags,
        fcpl: PlistId,
    ) -> Result<ObjectId, VolError> {
        self.ensure_active()?;
        ensure_unbound(access)?;
        let flags = self.effective_flags(flags, "create");

        let record = &mut access.record;
        record.set_file_path(path);
        let created = self
            .native()
            .file_create(path, flags, fcpl, record.access_plist())
            .context("Creating file");
        let file = match created {
            Ok(file) => file,
            Err(error) => {
                record.unbind();
                return Err(error);
            }
        };
        record.bind(file);

        debug!(%file, "File created");
        Ok(file)
    }

    /// Opens an existing native file through `access`.
    #[instrument(level = "debug", skip(self, access), fields(connector = %self.id()))]
    pub fn file_open(
        &self,
        access: &mut AccessConfig,
        path: &str,
        flags: AccessFlags,
    ) -> Result<ObjectId, VolError> {
        self.ensure_active()?;
        ensure_unbound(access)?;
        let flags = self.effective_flags(flags, "open");

        let record = &mut access.record;
        record.set_file_path(path);
        let opened =
            self.native().file_open(path, flags, record.access_plist()).context("Opening file");
        let file = match opened {
            Ok(file) => file,
            Err(error) => {
                record.unbind();
                return Err(error);
            }
        };
        record.bind(file);

        debug!(%file, "File opened");
        Ok(file)
    }

    /// Closes the native file bound to `access`. The configuration itself stays alive.
    #[instrument(level = "debug", skip_all, fields(connector = %self.id()))]
    pub fn file_close(&self, access: &mut AccessConfig) -> Result<(), VolError> {
        self.ensure_active()?;
        let Some(file) = access.file() else {
            return Err(VolError::InvalidHandle {
                message: "no file is open through this access configuration".into(),
                context: None,
            });
        };
        self.native().file_close(file).context("Closing file")?;
        access.record.unbind();

        debug!(%file, "File closed");
        Ok(())
    }

    fn effective_flags(&self, flags: AccessFlags, operation: &'static str) -> AccessFlags {
        match self.settings().open_flags {
            OpenFlagsPolicy::Honor => flags,
            OpenFlagsPolicy::ForceTruncate => {
                warn!(
                    operation,
                    requested = ?flags,
                    "Forcing truncate, existing contents are discarded"
                );
                flags | AccessFlags::TRUNCATE
            }
        }
    }
}

fn ensure_unbound(access: &AccessConfig) -> Result<(), VolError> {
    match access.file() {
        None => Ok(()),
        Some(file) => Err(VolError::InvalidHandle {
            message: format!("access configuration already has {file} open").into(),
            context: None,
        }),
    }
}
