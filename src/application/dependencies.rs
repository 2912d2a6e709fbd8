use crate::ports::LibraryStore;
use std::sync::Arc;

/// サービスの依存関係
///
/// 振る舞いは持たず、各ワークフロー関数に引数として渡す。
/// ワークフローはここから作業単位を1つ開始し、その中で読み取り・変更・書き込みを行う。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub store: Arc<dyn LibraryStore>,
}

impl ServiceDependencies {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }
}
