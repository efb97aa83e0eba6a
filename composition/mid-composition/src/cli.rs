//! CLI 用ランタイム配線。

use mid_adapter_clock::ClockAdapter;
use mid_adapter_elevation::ElevationAdapter;
use mid_adapter_fs::FsAdapter;
use mid_adapter_paths as paths;
use mid_adapter_platform::PlatformAccessor;
use mid_app::{MachineIdDeps, MachineIdService};
use mid_domain::DomainError;
use mid_domain::model::ElevatedLaunch;
use mid_domain::port::driven::ElevationLauncher;
use mid_domain::port::driving::MachineIdUseCase;
use mid_log_utils::write_lifecycle_line;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LIFECYCLE_COMPONENT: &str = "mid-cli";

/// CLI実行ファイル用の依存関係
pub struct CliRuntime {
    data_dir: PathBuf,
    accessor: PlatformAccessor,
    elevation: Box<dyn ElevationLauncher>,
    fs: FsAdapter,
    clock: ClockAdapter,
}

impl CliRuntime {
    /// `--data-dir` 指定（なければ環境変数／既定）で作成
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        let data_dir = paths::resolve_data_dir(data_dir);
        let accessor = PlatformAccessor::detect(&data_dir);
        Self::with_parts(data_dir, accessor, Box::new(ElevationAdapter::current_exe()))
    }

    /// アクセサと昇格手段を差し替えて作成
    pub fn with_parts(
        data_dir: PathBuf,
        accessor: PlatformAccessor,
        elevation: Box<dyn ElevationLauncher>,
    ) -> Self {
        Self {
            fs: FsAdapter::new(&data_dir),
            clock: ClockAdapter::new(),
            data_dir,
            accessor,
            elevation,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 設定とバインディングを読み込んだサービスを組み立てる
    pub fn service(&self) -> Result<MachineIdService<'_>, DomainError> {
        MachineIdService::new(MachineIdDeps {
            accessor: &self.accessor,
            elevation: self.elevation.as_ref(),
            backup: &self.fs,
            history: &self.fs,
            bindings: &self.fs,
            config: &self.fs,
            accounts: &self.fs,
            clock: &self.clock,
            ids: &self.clock,
            files: &self.fs,
        })
    }

    /// 昇格再起動。要求と結果をライフサイクルログに残す
    pub fn request_elevation(
        &self,
        service: &MachineIdService<'_>,
        args: &[String],
    ) -> Result<ElevatedLaunch, DomainError> {
        info!(?args, "requesting elevated relaunch");
        write_lifecycle_line(
            &self.data_dir,
            LIFECYCLE_COMPONENT,
            &format!("elevation requested: args={:?}", args),
        );
        let result = service.request_admin_restart(args);
        let message = match &result {
            Ok(ElevatedLaunch::NotRequired) => {
                info!("elevation not required");
                "elevation not required".to_string()
            }
            Ok(ElevatedLaunch::Relaunched { exit_code }) => {
                info!(?exit_code, "elevated instance finished");
                format!("elevated instance finished: exit_code={:?}", exit_code)
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind().as_str(), "elevation failed");
                format!("elevation failed: {} ({})", e, e.kind().as_str())
            }
        };
        write_lifecycle_line(&self.data_dir, LIFECYCLE_COMPONENT, &message);
        result
    }
}
