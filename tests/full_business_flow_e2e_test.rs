// ==========================================
// 全业务流程端到端测试
// ==========================================
// 场景: 活动确认 -> 需求分桶 -> 生成拣货单 -> 拣货保存/完结
//       -> 退库初始化 -> 盘点 -> 完成 -> 异常报表
// ==========================================

mod test_helpers;

use std::sync::Arc;

use chrono::NaiveDate;
use catering_almacen::api::{IncidentApi, NeedsApi, PickingApi, ReturnsApi};
use catering_almacen::engine::{
    BucketSelection, IncidentEngine, NeedsAggregator, PickingEngine, PickingItemUpdate,
    ReturnEngine, ReturnItemUpdate,
};
use catering_almacen::domain::types::OrderType;
use test_helpers::{create_test_db, create_test_repositories, test_event, test_order};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_full_fulfillment_and_reconciliation_flow() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = create_test_repositories(&db_path).unwrap();

    // ===== 1. 活动与订单 =====
    repos
        .event_repo
        .upsert(&test_event("ev-1", "OS-2026-12345", date(2026, 3, 14)))
        .unwrap();
    repos
        .order_repo
        .upsert(&test_order(
            "o1",
            "ev-1",
            OrderType::Bio,
            None,
            vec![("TOMATE", 10, 1.2), ("PAN", 4, 0.3)],
        ))
        .unwrap();
    repos
        .order_repo
        .upsert(&test_order(
            "o2",
            "ev-1",
            OrderType::Alquiler,
            None,
            vec![("MESA", 6, 4.0)],
        ))
        .unwrap();

    let needs_api = NeedsApi::new(Arc::new(NeedsAggregator::new(repos.clone())));
    let picking_api = PickingApi::new(
        Arc::new(PickingEngine::new(repos.clone())),
        repos.clone(),
    );
    let returns_api = ReturnsApi::new(Arc::new(ReturnEngine::new(repos.clone())));
    let incident_api = IncidentApi::new(Arc::new(IncidentEngine::new(repos.clone())));

    // ===== 2. 需求分桶 =====
    let overview = needs_api.overview().unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].events[0].buckets.len(), 2);
    assert_eq!(overview[0].total_quantity, 20);

    // ===== 3. 生成拣货单 (两个分桶合并为一张) =====
    let created = needs_api
        .generate_sheets(
            &[
                BucketSelection {
                    date: date(2026, 3, 14),
                    event_id: "ev-1".to_string(),
                    order_type: OrderType::Bio,
                },
                BucketSelection {
                    date: date(2026, 3, 14),
                    event_id: "ev-1".to_string(),
                    order_type: OrderType::Alquiler,
                },
            ],
            Some("Sala"),
        )
        .unwrap();
    assert_eq!(created, vec!["12345.01".to_string()]);

    let sheet = picking_api.get_sheet("12345.01").unwrap();
    assert_eq!(sheet.service_number, "OS-2026-12345");
    assert_eq!(sheet.requested_by.as_deref(), Some("Sala"));
    assert_eq!(sheet.total_count, 3);
    assert!(!sheet.is_complete);

    // ===== 4. 拣货: PAN 缺货触发预填备注, 其余相符 =====
    let saved = picking_api
        .save_progress(
            "12345.01",
            &[
                PickingItemUpdate {
                    item_code: "TOMATE".to_string(),
                    is_checked: Some(true),
                    picked_quantity: Some(10),
                    ..Default::default()
                },
                PickingItemUpdate {
                    item_code: "PAN".to_string(),
                    is_checked: Some(true),
                    picked_quantity: Some(0),
                    ..Default::default()
                },
                PickingItemUpdate {
                    item_code: "MESA".to_string(),
                    is_checked: Some(true),
                    picked_quantity: Some(6),
                    ..Default::default()
                },
            ],
            sheet.revision,
        )
        .unwrap();
    assert_eq!(saved.checked_count, 3);
    assert!(saved.is_complete);
    let pan = saved.items.iter().find(|i| i.item_code == "PAN").unwrap();
    assert_eq!(pan.incident_comment, "No habia disponible el articulo");

    let finalized = picking_api.finalize("12345.01", saved.revision).unwrap();
    assert_eq!(finalized.status, "Listo");

    // ===== 5. 退库初始化: 租赁预填, 生鲜归零 =====
    let return_sheet = returns_api.get_or_init("ev-1").unwrap();
    assert_eq!(return_sheet.revision, 0);
    assert_eq!(return_sheet.items.len(), 3);
    let mesa = return_sheet
        .items
        .iter()
        .find(|i| i.item_code == "MESA")
        .unwrap();
    assert_eq!(mesa.returned_quantity, 6);
    let tomate = return_sheet
        .items
        .iter()
        .find(|i| i.item_code == "TOMATE")
        .unwrap();
    assert_eq!(tomate.returned_quantity, 0);

    // ===== 6. 盘点: 一张桌子损坏 =====
    let saved = returns_api
        .save_progress(
            "ev-1",
            &[ReturnItemUpdate {
                order_id: "o2".to_string(),
                item_code: "MESA".to_string(),
                returned_quantity: Some(5),
                is_reviewed: Some(true),
                incident_comment: Some("Pata rota".to_string()),
            }],
            return_sheet.revision,
        )
        .unwrap();
    assert_eq!(saved.status, "Procesando");
    let mesa = saved.items.iter().find(|i| i.item_code == "MESA").unwrap();
    assert_eq!(mesa.consumed, 1);
    assert!(mesa.has_incident);
    // MESA 消耗 1 + TOMATE 10 + PAN 4 (未盘点行按预填值计)
    assert_eq!(saved.total_lost, 15);

    let completed = returns_api.complete("ev-1", saved.revision).unwrap();
    assert_eq!(completed.status, "Completado");

    // ===== 7. 异常报表 =====
    let report = incident_api.report(None, None).unwrap();
    assert_eq!(report.total_records, 1);
    assert_eq!(report.groups[0].records[0].item_code, "MESA");
    assert!((report.total_merma_value - 4.0).abs() < f64::EPSILON);
}
