//! mid: 機械識別子の確認／変更／復元／履歴／アカウントバインディングを扱う管理用 CLI。

use clap::{Parser, Subcommand, ValueEnum};
use mid_composition::app::{BindingChange, MachineIdService, SwitchOutcome};
use mid_composition::cli::CliRuntime;
use mid_composition::domain::DomainError;
use mid_composition::domain::model::{
    ConfigPatch, ElevatedLaunch, HistoryEntry, MachineId, MachineIdConfig, MutationReport,
};
use mid_composition::domain::port::driving::MachineIdUseCase;
use mid_composition::error::{Result, err};
use mid_composition::log_utils;
use mid_composition::present::{action_label, describe_error, format_timestamp, platform_note};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mid", version, about = "Machine identifier management CLI")]
struct Cli {
    /// データディレクトリ（設定・バックアップ・履歴の保存先）
    #[arg(long, global = true, env = "MID_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// 診断ログを詳細にする（-v, -vv）
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 現在の識別子・原本・権限・設定を表示
    Status {
        /// JSON形式で出力
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// 識別子を変更（省略時はランダムな UUID）
    Change {
        id: Option<String>,
    },
    /// 原本の識別子に戻す
    Restore {
        /// 現在値が原本と同じでも復元を実行
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// 現在の識別子をファイルへ書き出す
    Export {
        path: PathBuf,
    },
    /// ファイルから識別子を読み込む
    Import {
        path: PathBuf,
        /// 読み込んだ値をそのまま適用
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// 変更履歴（新しい順）
    History {
        /// JSON形式で出力
        #[arg(long, default_value_t = false)]
        json: bool,
        /// 表示件数の上限
        #[arg(long)]
        limit: Option<usize>,
    },
    /// 変更履歴を削除（原本バックアップは残る）
    ClearHistory,
    /// アカウントと識別子の対応を表示
    Bindings {
        /// JSON形式で出力
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// 自動切替・バインディング設定の表示／変更
    Config {
        #[arg(long)]
        auto_switch: Option<Toggle>,
        #[arg(long)]
        bind: Option<Toggle>,
        #[arg(long)]
        use_bound: Option<Toggle>,
    },
    /// アカウントイベント
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },
    /// 管理者権限（root）で再起動して指定コマンドを実行
    Elevate {
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// アカウントが切り替わったことを通知
    Switch { id: String },
    /// アカウントが削除されたことを通知
    Delete { id: String },
    /// アカウントに識別子を明示的にバインド（適用はしない）
    Rebind { id: String, machine_id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            match e.downcast_ref::<DomainError>() {
                Some(domain) => eprintln!("mid failed: {}", describe_error(domain)),
                None => eprintln!("mid failed: {e}"),
            }
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    log_utils::init_tracing(cli.verbose);

    // 全依存関係はComposition Rootで組み立て
    let runtime = CliRuntime::new(cli.data_dir);
    let service = runtime.service()?;

    match cli.command {
        Command::Status { json } => print_status(&service, json)?,

        Command::Change { id } => {
            let id = id.map(MachineId::parse).transpose()?;
            let report = service.change(id)?;
            print_report("Machine identifier changed", &report);
        }

        Command::Restore { force } => {
            if !force && service.is_current_original()? {
                println!("Current machine identifier already equals the original; nothing to do.");
                return Ok(0);
            }
            let report = service.restore_original()?;
            print_report("Original machine identifier restored", &report);
        }

        Command::Export { path } => {
            let id = service.backup_to_file(&path)?;
            println!("Exported {} to {}", id, path.display());
        }

        Command::Import { path, apply } => {
            let outcome = service.restore_from_file(Some(&path))?;
            let id = outcome
                .machine_id
                .ok_or_else(|| err(format!("no identifier read from {}", path.display())))?;
            if apply {
                let report = service.change(Some(id))?;
                print_report("Imported machine identifier applied", &report);
            } else {
                println!("Read {} from {}", id, path.display());
                println!("Run `mid change {}` to apply it.", id);
            }
        }

        Command::History { json, limit } => {
            let mut entries = service.get_history()?;
            entries.reverse();
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            if json {
                let body: Vec<JsonHistoryEntry> =
                    entries.iter().map(JsonHistoryEntry::from).collect();
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else if entries.is_empty() {
                println!("No history.");
            } else {
                for entry in &entries {
                    println!(
                        "{}  {:<16}  {}",
                        format_timestamp(entry.timestamp),
                        action_label(entry.action),
                        entry.machine_id
                    );
                }
            }
        }

        Command::ClearHistory => {
            service.clear_history()?;
            println!("History cleared (original backup kept).");
        }

        Command::Bindings { json } => {
            let views = service.binding_views();
            if json {
                let body: Vec<JsonBinding> = views
                    .iter()
                    .map(|v| JsonBinding {
                        account_id: v.account_id.to_string(),
                        email: v.email.clone(),
                        machine_id: v.machine_id.to_string(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else if views.is_empty() {
                println!("No account bindings.");
            } else {
                println!("Account bindings ({}):", views.len());
                for view in &views {
                    println!("  {} -> {}", view.label(), view.machine_id);
                }
            }
        }

        Command::Config {
            auto_switch,
            bind,
            use_bound,
        } => {
            let patch = ConfigPatch {
                auto_switch_on_account_change: auto_switch.map(Toggle::enabled),
                bind_machine_id_to_account: bind.map(Toggle::enabled),
                use_binded_machine_id: use_bound.map(Toggle::enabled),
            };
            let config = if patch.is_empty() {
                service.config()
            } else {
                service.update_config(&patch)?
            };
            print_config(&config);
        }

        Command::Account { command } => match command {
            AccountCommand::Switch { id } => match service.on_account_switched(&id)? {
                SwitchOutcome::Skipped => {
                    println!("Automatic switching is disabled; machine identifier unchanged.")
                }
                SwitchOutcome::Applied { report, binding } => {
                    let title = match binding {
                        BindingChange::None => "Switched to a fresh machine identifier",
                        BindingChange::Reused => "Switched to the bound machine identifier",
                        BindingChange::Created => "Switched and bound a new machine identifier",
                    };
                    print_report(title, &report);
                }
            },
            AccountCommand::Delete { id } => {
                if service.on_account_deleted(&id)? {
                    println!("Binding for {id} removed.");
                } else {
                    println!("No binding for {id}.");
                }
            }
            AccountCommand::Rebind { id, machine_id } => {
                let machine_id = MachineId::parse(machine_id)?;
                let report = service.rebind(&id, machine_id)?;
                println!("{id} bound to {}", report.machine_id());
                if let Some(e) = report.history_error() {
                    eprintln!("warning: the binding was stored but not recorded in history: {e}");
                }
            }
        },

        Command::Elevate { args } => {
            let mut forwarded = vec![
                "--data-dir".to_string(),
                runtime.data_dir().to_string_lossy().into_owned(),
            ];
            if args.is_empty() {
                forwarded.push("status".to_string());
            } else {
                forwarded.extend(args);
            }
            match runtime.request_elevation(&service, &forwarded)? {
                ElevatedLaunch::NotRequired => {
                    println!("Already running with the required privileges.");
                }
                ElevatedLaunch::Relaunched { exit_code } => return Ok(exit_code.unwrap_or(0)),
            }
        }
    }
    Ok(0)
}

fn print_report(title: &str, report: &MutationReport) {
    println!("{title}: {}", report.machine_id());
    if let Some(e) = report.history_error() {
        eprintln!("warning: the change was applied but not recorded in history: {e}");
    }
    if let Some(e) = report.binding_error() {
        eprintln!("warning: the change was applied but the account binding was not saved: {e}");
    }
}

fn print_config(config: &MachineIdConfig) {
    let on_off = |v: bool| if v { "on" } else { "off" };
    println!(
        "auto-switch on account change: {}",
        on_off(config.auto_switch_on_account_change)
    );
    println!(
        "bind identifier to account:    {}",
        on_off(config.bind_machine_id_to_account)
    );
    println!(
        "reuse bound identifier:        {}",
        on_off(config.use_binded_machine_id)
    );
}

fn print_status(service: &MachineIdService<'_>, json: bool) -> Result<()> {
    let os = service.get_os_type();
    let current = service.refresh_current()?;
    let backup = service.get_backup()?;
    let config = service.config();
    let status = JsonStatus {
        os: os.as_str(),
        os_name: os.display_name(),
        admin: service.check_admin(),
        current: current.to_string(),
        original: backup.as_ref().map(|b| b.value.to_string()),
        original_captured_at: backup.as_ref().map(|b| b.captured_at),
        is_original: backup.as_ref().map(|b| b.value == current),
        bound_accounts: service.get_bindings().len(),
        config: JsonConfig {
            auto_switch_on_account_change: config.auto_switch_on_account_change,
            bind_machine_id_to_account: config.bind_machine_id_to_account,
            use_binded_machine_id: config.use_binded_machine_id,
        },
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("Platform:   {} ({})", status.os_name, platform_note(os));
    println!(
        "Privileges: {}",
        if status.admin { "elevated" } else { "standard" }
    );
    println!("Current:    {}", status.current);
    match (&status.original, status.original_captured_at) {
        (Some(original), Some(at)) => {
            println!("Original:   {} (captured {})", original, format_timestamp(at))
        }
        _ => println!("Original:   not captured yet"),
    }
    println!("Bound accounts: {}", status.bound_accounts);
    print_config(&config);
    Ok(())
}

// ---------- JSON 出力 ----------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonStatus {
    os: &'static str,
    os_name: &'static str,
    admin: bool,
    current: String,
    original: Option<String>,
    original_captured_at: Option<u64>,
    is_original: Option<bool>,
    bound_accounts: usize,
    config: JsonConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonConfig {
    auto_switch_on_account_change: bool,
    bind_machine_id_to_account: bool,
    use_binded_machine_id: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonHistoryEntry {
    id: String,
    machine_id: String,
    action: &'static str,
    timestamp: u64,
}

impl From<&HistoryEntry> for JsonHistoryEntry {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            machine_id: entry.machine_id.to_string(),
            action: entry.action.as_str(),
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonBinding {
    account_id: String,
    email: Option<String>,
    machine_id: String,
}
