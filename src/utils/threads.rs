use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// 以最大并发数执行一组future，结果顺序与输入顺序一致
pub async fn do_parallel_with_limit<F, T>(futures: Vec<F>, max_concurrent: usize) -> Vec<T>
where
    F: Future<Output = T>,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    let tasks = futures.into_iter().map(|future| {
        let semaphore = semaphore.clone();
        async move {
            // 信号量从不关闭，acquire不会失败
            let _permit = semaphore.acquire().await;
            future.await
        }
    });

    join_all(tasks).await
}
