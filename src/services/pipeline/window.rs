//! 历史窗口

/// 历史窗口下限
pub const MIN_HISTORY: usize = 3;
/// 历史窗口上限
pub const MAX_HISTORY: usize = 30;
/// 默认读取条数
pub const DEFAULT_HISTORY: usize = 10;

/// 读取历史的条数上限，构造时钳制到 [3, 30]
///
/// 越界的请求值会被修正而不是拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow(usize);

impl HistoryWindow {
    pub fn new(requested: usize) -> Self {
        Self(requested.clamp(MIN_HISTORY, MAX_HISTORY))
    }

    pub fn limit(self) -> usize {
        self.0
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}
