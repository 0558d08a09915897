use crate::error::{MonitorError, Result};
use crate::model::{AggregateInterval, AggregatedMetric, MetricType};
use crate::store::MetricStore;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// 单个时间桶的累积量
struct BucketAccumulator {
    sum: f64,
    min: f64,
    max: f64,
    count: u64,
}

/// 聚合引擎
///
/// 对原始样本按需计算窗口统计，结果不落库。
/// 无样本的桶直接省略（稀疏序列），调用方不能假设每个间隔都有桶；
/// 未知服务器返回空序列而非错误，服务器身份校验属于调用方
pub struct Aggregator {
    store: Arc<MetricStore>,
}

impl Aggregator {
    pub fn new(store: Arc<MetricStore>) -> Self {
        Self { store }
    }

    /// 计算窗口统计
    ///
    /// # 参数
    /// * `server_id` - 服务器 ID
    /// * `metric_type` - 指标类型
    /// * `interval` - 时间桶宽度
    /// * `lookback_hours` - 回看时长（小时）
    ///
    /// # 返回
    /// 按时间升序的聚合序列，每个间隔边界至多一个桶
    pub async fn aggregate(
        &self,
        server_id: &str,
        metric_type: MetricType,
        interval: AggregateInterval,
        lookback_hours: u32,
    ) -> Result<Vec<AggregatedMetric>> {
        if lookback_hours == 0 {
            return Err(MonitorError::validation(
                "lookback_hours must be greater than zero",
            ));
        }

        let end = Utc::now();
        let start = end - Duration::hours(lookback_hours as i64);

        let samples = self
            .store
            .query_samples(server_id, metric_type, start, end)
            .await?;

        let bucket_seconds = interval.as_seconds();
        let mut buckets: BTreeMap<i64, BucketAccumulator> = BTreeMap::new();

        for sample in &samples {
            let ts = sample.timestamp.timestamp();
            // 时间戳向下取整到桶边界
            let bucket_start = ts.div_euclid(bucket_seconds) * bucket_seconds;

            buckets
                .entry(bucket_start)
                .and_modify(|acc| {
                    acc.sum += sample.value;
                    acc.min = acc.min.min(sample.value);
                    acc.max = acc.max.max(sample.value);
                    acc.count += 1;
                })
                .or_insert(BucketAccumulator {
                    sum: sample.value,
                    min: sample.value,
                    max: sample.value,
                    count: 1,
                });
        }

        let result: Vec<AggregatedMetric> = buckets
            .into_iter()
            .map(|(bucket_start, acc)| AggregatedMetric {
                server_id: server_id.to_string(),
                metric_type,
                interval,
                bucket_start: bucket_datetime(bucket_start),
                avg: acc.sum / acc.count as f64,
                min: acc.min,
                max: acc.max,
                sample_count: acc.count,
            })
            .collect();

        debug!(
            server_id = %server_id,
            metric_type = %metric_type.as_str(),
            interval = %interval.as_str(),
            samples = samples.len(),
            buckets = result.len(),
            "Aggregation computed"
        );

        Ok(result)
    }
}

fn bucket_datetime(epoch_seconds: i64) -> DateTime<Utc> {
    // 桶边界由合法时间戳取整而来，必然可表示
    Utc.timestamp_opt(epoch_seconds, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::model::MetricSample;
    use sea_orm::Database;

    async fn create_test_aggregator() -> (Aggregator, Arc<MetricStore>) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        init_schema(&db).await.unwrap();
        let store = Arc::new(MetricStore::new(Arc::new(db)));
        (Aggregator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_single_sample_bucket() {
        let (aggregator, store) = create_test_aggregator().await;

        let sample = MetricSample::new("srv_001", MetricType::CpuUsage, 42.0);
        store.insert_sample(sample).await.unwrap();

        let buckets = aggregator
            .aggregate("srv_001", MetricType::CpuUsage, AggregateInterval::OneMinute, 1)
            .await
            .unwrap();

        // 单样本桶：avg = min = max = value
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].avg, 42.0);
        assert_eq!(buckets[0].min, 42.0);
        assert_eq!(buckets[0].max, 42.0);
        assert_eq!(buckets[0].sample_count, 1);
    }

    #[tokio::test]
    async fn test_bucket_statistics() {
        let (aggregator, store) = create_test_aggregator().await;

        // 三个样本落入同一个 1 小时桶
        let base = Utc::now() - Duration::minutes(30);
        let bucket_start = base.timestamp().div_euclid(3600) * 3600;
        for (offset, value) in [(0, 10.0), (5, 20.0), (10, 60.0)] {
            let ts = Utc.timestamp_opt(bucket_start + offset, 0).unwrap();
            let sample = MetricSample::new("srv_001", MetricType::MemoryUsage, value)
                .with_timestamp(ts);
            store.insert_sample(sample).await.unwrap();
        }

        let buckets = aggregator
            .aggregate("srv_001", MetricType::MemoryUsage, AggregateInterval::OneHour, 2)
            .await
            .unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].avg, 30.0);
        assert_eq!(buckets[0].min, 10.0);
        assert_eq!(buckets[0].max, 60.0);
        assert_eq!(buckets[0].sample_count, 3);
    }

    #[tokio::test]
    async fn test_sparse_buckets_chronological() {
        let (aggregator, store) = create_test_aggregator().await;

        let now = Utc::now();
        // 两个样本相隔 30 分钟，中间的 1 分钟桶全部省略
        for minutes_ago in [40, 10] {
            let sample = MetricSample::new("srv_001", MetricType::ResponseTime, 100.0)
                .with_timestamp(now - Duration::minutes(minutes_ago));
            store.insert_sample(sample).await.unwrap();
        }

        let buckets = aggregator
            .aggregate("srv_001", MetricType::ResponseTime, AggregateInterval::OneMinute, 1)
            .await
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].bucket_start < buckets[1].bucket_start);
    }

    #[tokio::test]
    async fn test_unknown_server_returns_empty() {
        let (aggregator, _store) = create_test_aggregator().await;

        let buckets = aggregator
            .aggregate("srv_unknown", MetricType::CpuUsage, AggregateInterval::FiveMinutes, 24)
            .await
            .unwrap();
        assert!(buckets.is_empty());
    }

    #[tokio::test]
    async fn test_zero_lookback_rejected() {
        let (aggregator, _store) = create_test_aggregator().await;

        let err = aggregator
            .aggregate("srv_001", MetricType::CpuUsage, AggregateInterval::OneMinute, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::ValidationError(_)));
    }
}
