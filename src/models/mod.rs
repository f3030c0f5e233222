//! 核心数据模型模块
//!
//! 定义 Persona Chat 的核心数据结构：User, Persona, HistoryEntry。

pub mod message;
pub mod persona;
pub mod user;

pub use message::*;
pub use persona::*;
pub use user::*;
