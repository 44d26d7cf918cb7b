//! モデル定義
//!
//! groundflowで使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod manifest;
mod provider;
mod resource;

// Re-exports
pub use manifest::*;
pub use provider::*;
pub use resource::*;
