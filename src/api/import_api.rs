// ==========================================
// 学生批量导入API
// ==========================================
// 职责: 封装 预览 → 确认分区 → 执行 → 记录历史 的完整流程
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::import_run::{ImportRunReport, RowOutcome};
use crate::domain::student::{
    MappingWarning, PartitionHint, PartitionKey, PartitionStrategy, ValidationIssue,
};
use crate::domain::types::{CanonicalField, PartitionDimension};
use crate::engine::{ImportExecutor, ImportJob, ImportProgress};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::import_trait::DataCleaner as _;
use crate::importer::{ImportPipeline, PartitionSummary, PrepareOptions, PreparedImport};
use crate::repository::{
    IdentityRepositoryImpl, ImportRunEntity, ImportRunRepository, StudentRepositoryImpl,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 列映射（展示用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMappingDto {
    pub column: usize,
    pub header: String,
    pub field: Option<CanonicalField>,
}

/// 工作表预览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetPreviewDto {
    pub sheet_name: String,
    pub row_count: usize,
    pub columns: Vec<ColumnMappingDto>,
    pub warnings: Vec<MappingWarning>,
}

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreviewResponse {
    pub sheets: Vec<SheetPreviewDto>,
    /// 标准化后的记录数
    pub total_records: usize,
    /// 可导入记录数
    pub eligible: usize,
    /// 存在校验问题的记录数
    pub invalid: usize,
    /// 因学号/姓名为空被跳过的行数
    pub skipped: usize,
    pub issues: Vec<ValidationIssue>,
    pub partitions: PartitionSummary,
    /// 建议的默认分区选择
    pub suggested_partition: PartitionHint,
}

/// 导入执行响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRunResponse {
    pub report: ImportRunReport,
    /// 需要在新一次运行中重新提交的行
    pub rows_to_resubmit: Vec<RowOutcome>,
    pub elapsed_ms: i64,
}

/// 导入API
pub struct ImportApi {
    pipeline: ImportPipeline,
    executor: ImportExecutor<StudentRepositoryImpl, IdentityRepositoryImpl>,
    run_repo: ImportRunRepository,
    cleaner: DataCleaner,
}

impl ImportApi {
    /// 打开数据库并加载配置
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时创建并建表）
    pub async fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(format!("建表失败: {}", e)))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::InternalError(format!("创建配置管理器失败: {}", e)))?;
        Self::from_parts(conn, &config_manager).await
    }

    /// 由已建表的连接与配置读取器组装
    pub async fn from_parts<C: ImportConfigReader>(
        conn: Arc<Mutex<Connection>>,
        config_reader: &C,
    ) -> ApiResult<Self> {
        let config = config_reader
            .load_import_config()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("加载导入配置失败: {}", e)))?;

        let store = Arc::new(StudentRepositoryImpl::from_connection(conn.clone()));
        let identity = Arc::new(IdentityRepositoryImpl::from_connection(conn.clone()));
        let executor = ImportExecutor::new(store, identity, &config);

        Ok(Self {
            pipeline: ImportPipeline::new(config),
            executor,
            run_repo: ImportRunRepository::from_connection(conn),
            cleaner: DataCleaner,
        })
    }

    /// 解析并校验文件（无副作用）
    pub fn prepare(&self, file_path: &Path, options: &PrepareOptions) -> ApiResult<PreparedImport> {
        Ok(self.pipeline.prepare_file(file_path, options)?)
    }

    /// 生成预览响应
    pub fn summarize(&self, prepared: &PreparedImport) -> ImportPreviewResponse {
        if prepared.partitions.has_unexpected() {
            warn!("检测到不在允许列表中的分区值，请确认后再导入");
        }

        let sheets = prepared
            .sheets
            .iter()
            .map(|sheet| SheetPreviewDto {
                sheet_name: sheet.sheet_name.clone(),
                row_count: sheet.row_count,
                columns: sheet
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(column, header)| ColumnMappingDto {
                        column,
                        header: header.clone(),
                        field: sheet.mapping.field_at(column),
                    })
                    .collect(),
                warnings: sheet.warnings.clone(),
            })
            .collect();

        ImportPreviewResponse {
            sheets,
            total_records: prepared.records.len(),
            eligible: prepared.eligible_count(),
            invalid: prepared.invalid_count(),
            skipped: prepared.skipped.len(),
            issues: prepared.issues().into_iter().cloned().collect(),
            partitions: prepared.partitions.clone(),
            suggested_partition: prepared.partitions.suggest_default(),
        }
    }

    /// 预览（prepare + summarize）
    pub fn preview(
        &self,
        file_path: &Path,
        options: &PrepareOptions,
    ) -> ApiResult<ImportPreviewResponse> {
        let prepared = self.prepare(file_path, options)?;
        Ok(self.summarize(&prepared))
    }

    /// 由操作员选择构建分区方式
    ///
    /// # 参数
    /// - selection: 操作员输入的 院系/年级/班级（会按字段规则清洗）
    /// - per_record: true 时按记录自身分区值，selection 作为缺失维度的补齐
    ///
    /// # 返回
    /// - Err(InvalidInput): 统一分区模式下有维度未选择
    pub fn build_strategy(
        &self,
        selection: &PartitionHint,
        per_record: bool,
    ) -> ApiResult<PartitionStrategy> {
        let departments = &self.pipeline.config().departments;
        let clean = |dimension: PartitionDimension| {
            selection.get(dimension).and_then(|raw| match dimension {
                PartitionDimension::Department => {
                    self.cleaner.resolve_department(raw, departments)
                }
                _ => self.cleaner.clean_field(dimension.field(), raw),
            })
        };
        let cleaned = PartitionHint {
            department: clean(PartitionDimension::Department),
            year: clean(PartitionDimension::Year),
            section: clean(PartitionDimension::Section),
        };

        if per_record {
            return Ok(PartitionStrategy::PerRecord { fallback: cleaned });
        }

        match (cleaned.department, cleaned.year, cleaned.section) {
            (Some(department), Some(year), Some(section)) => {
                let label = self.pipeline.config().department_label(&department);
                info!(
                    department = %department,
                    department_label = label.unwrap_or("-"),
                    year = %year,
                    section = %section,
                    "统一分区已确认"
                );
                Ok(PartitionStrategy::Uniform {
                    key: PartitionKey::new(department, year, section),
                })
            }
            _ => Err(ApiError::InvalidInput(
                "统一分区模式需要同时指定院系、年级和班级".to_string(),
            )),
        }
    }

    /// 进度观察句柄
    pub fn progress(&self) -> ImportProgress {
        self.executor.subscribe()
    }

    /// 执行导入并记录历史
    ///
    /// # 参数
    /// - prepared: 预览结果（仅可导入记录会被执行）
    /// - strategy: 分区方式
    /// - source_file: 来源文件名（记录到历史）
    /// - cancel: 协作式取消令牌
    pub async fn run_import(
        &self,
        prepared: &PreparedImport,
        strategy: PartitionStrategy,
        source_file: Option<&str>,
        cancel: CancellationToken,
    ) -> ApiResult<ImportRunResponse> {
        let start = Instant::now();

        let job = ImportJob {
            records: prepared.eligible_records(),
            strategy,
            source_file: source_file.map(str::to_string),
        };
        let report = self.executor.execute(job, cancel).await?;

        if let Err(e) = self.run_repo.save(&report.run, source_file) {
            warn!(run_id = %report.run.run_id, error = %e, "导入历史保存失败");
        }

        let rows_to_resubmit = report.rows_to_resubmit().into_iter().cloned().collect();
        let elapsed_ms = start.elapsed().as_millis() as i64;
        info!(run_id = %report.run.run_id, elapsed_ms, "导入API调用完成");

        Ok(ImportRunResponse {
            report,
            rows_to_resubmit,
            elapsed_ms,
        })
    }

    /// 最近的导入历史
    pub fn list_history(&self, limit: usize) -> ApiResult<Vec<ImportRunEntity>> {
        let limit = limit.clamp(1, 100);
        Ok(self.run_repo.list_recent(limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn create_test_api() -> (NamedTempFile, ImportApi) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let api = ImportApi::open(&db_path).await.unwrap();
        (temp_file, api)
    }

    #[tokio::test]
    async fn test_build_strategy_uniform_cleans_selection() {
        let (_temp_file, api) = create_test_api().await;
        let selection = PartitionHint {
            department: Some("cse".to_string()),
            year: Some("3".to_string()),
            section: Some("a".to_string()),
        };

        let strategy = api.build_strategy(&selection, false).unwrap();
        assert_eq!(
            strategy,
            PartitionStrategy::Uniform {
                key: PartitionKey::new("CSE", "III", "A")
            }
        );
    }

    #[tokio::test]
    async fn test_build_strategy_resolves_department_label() {
        let (_temp_file, api) = create_test_api().await;
        let selection = PartitionHint {
            department: Some("Electronics & Communication Engineering".to_string()),
            year: Some("II".to_string()),
            section: Some("B".to_string()),
        };

        let strategy = api.build_strategy(&selection, false).unwrap();
        assert_eq!(
            strategy,
            PartitionStrategy::Uniform {
                key: PartitionKey::new("ECE", "II", "B")
            }
        );
    }

    #[tokio::test]
    async fn test_build_strategy_uniform_requires_all_dimensions() {
        let (_temp_file, api) = create_test_api().await;
        let selection = PartitionHint {
            department: Some("CSE".to_string()),
            year: None,
            section: Some("A".to_string()),
        };

        assert!(matches!(
            api.build_strategy(&selection, false),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.build_strategy(&selection, true),
            Ok(PartitionStrategy::PerRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_history_empty() {
        let (_temp_file, api) = create_test_api().await;
        assert!(api.list_history(10).unwrap().is_empty());
    }
}
