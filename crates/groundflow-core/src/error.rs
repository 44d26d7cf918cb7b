use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("未定義の変数です: {0}")]
    UnknownVariable(String),

    #[error(
        "プロジェクトルートが見つかりません\n探索開始位置: {0}\nヒント: ground.kdl ファイルを含むディレクトリで実行してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("リソースが重複定義されています: {0}")]
    DuplicateResource(String),

    #[error("未解決の参照です: {from} が {to} を参照していますが、対象のリソースが定義されていません")]
    UnresolvedReference { from: String, to: String },

    #[error("循環依存が検出されました: {0}")]
    CircularDependency(String),

    #[error("プロバイダーが定義されていません: {0}")]
    UnknownProvider(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
