//! 時刻ポート

pub trait Clock: Send + Sync {
    /// エポックからのミリ秒を取得
    fn now_ms(&self) -> u64;
}
