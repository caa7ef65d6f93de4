// ==========================================
// 异常汇总引擎集成测试
// ==========================================
// 职责: 验证跨活动扫描、分组排序、过滤与供应商清单
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use catering_almacen::engine::{
    IncidentEngine, IncidentFilter, ReturnEngine, ReturnItemUpdate,
};
use test_helpers::{
    create_test_db, create_test_repositories, test_event, test_order, test_rental_order,
};
use catering_almacen::domain::types::OrderType;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 两个活动, 各有一条带备注的异常行项
fn seed_two_events(repos: &catering_almacen::engine::WarehouseRepositories) {
    repos
        .event_repo
        .upsert(&test_event("ev-1", "OS-2026-11111", date(2026, 3, 10)))
        .unwrap();
    repos
        .event_repo
        .upsert(&test_event("ev-2", "OS-2026-22222", date(2026, 3, 20)))
        .unwrap();
    repos
        .order_repo
        .upsert(&test_order(
            "o1",
            "ev-1",
            OrderType::Bodega,
            None,
            vec![("VINO", 10, 8.0)],
        ))
        .unwrap();
    repos
        .order_repo
        .upsert(&test_rental_order(
            "o2",
            "ev-2",
            "prov-7",
            vec![("MESA", 6, 4.0)],
        ))
        .unwrap();

    let engine = ReturnEngine::new(repos.clone());
    engine.get_or_init("ev-1").unwrap();
    engine.get_or_init("ev-2").unwrap();
    engine
        .save_progress(
            "ev-1",
            &[ReturnItemUpdate {
                order_id: "o1".to_string(),
                item_code: "VINO".to_string(),
                returned_quantity: Some(6),
                is_reviewed: Some(true),
                incident_comment: Some("Botellas rotas".to_string()),
            }],
            0,
        )
        .unwrap();
    engine
        .save_progress(
            "ev-2",
            &[ReturnItemUpdate {
                order_id: "o2".to_string(),
                item_code: "MESA".to_string(),
                returned_quantity: Some(5),
                is_reviewed: Some(true),
                incident_comment: Some("Pata rota".to_string()),
            }],
            0,
        )
        .unwrap();
}

#[test]
fn test_report_groups_by_event_sorted_by_start_date_desc() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = create_test_repositories(&db_path).unwrap();
    seed_two_events(&repos);

    let engine = IncidentEngine::new(repos);
    let report = engine.report(&IncidentFilter::default()).unwrap();

    assert_eq!(report.total_records, 2);
    assert_eq!(report.groups.len(), 2);
    // start_date 降序: ev-2 (3-20) 在前
    assert_eq!(report.groups[0].event_id, "ev-2");
    assert_eq!(report.groups[1].event_id, "ev-1");
    assert_eq!(report.groups[0].service_number, "OS-2026-22222");

    // 按类型分组: Alquiler 在 Bodega 之前 (固定类型顺序)
    assert_eq!(report.by_type.len(), 2);
    assert_eq!(report.by_type[0].order_type, OrderType::Alquiler);
    assert_eq!(report.by_type[1].order_type, OrderType::Bodega);

    // 损耗金额: VINO 4*8.0 + MESA 1*4.0
    assert!((report.total_merma_value - 36.0).abs() < f64::EPSILON);
}

#[test]
fn test_report_search_filter_matches_comment_and_service_number() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = create_test_repositories(&db_path).unwrap();
    seed_two_events(&repos);

    let engine = IncidentEngine::new(repos);

    let by_comment = engine
        .report(&IncidentFilter {
            search: Some("botellas".to_string()),
            provider_id: None,
        })
        .unwrap();
    assert_eq!(by_comment.total_records, 1);
    assert_eq!(by_comment.groups[0].event_id, "ev-1");

    let by_service_number = engine
        .report(&IncidentFilter {
            search: Some("22222".to_string()),
            provider_id: None,
        })
        .unwrap();
    assert_eq!(by_service_number.total_records, 1);
    assert_eq!(by_service_number.groups[0].event_id, "ev-2");
}

#[test]
fn test_report_provider_filter_restricts_to_rental_records() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = create_test_repositories(&db_path).unwrap();
    seed_two_events(&repos);

    let engine = IncidentEngine::new(repos);
    let report = engine
        .report(&IncidentFilter {
            search: None,
            provider_id: Some("prov-7".to_string()),
        })
        .unwrap();

    assert_eq!(report.total_records, 1);
    assert_eq!(report.groups[0].event_id, "ev-2");
    assert_eq!(report.by_type[0].order_type, OrderType::Alquiler);

    // 未知供应商 -> 空报表
    let empty = engine
        .report(&IncidentFilter {
            search: None,
            provider_id: Some("prov-9".to_string()),
        })
        .unwrap();
    assert_eq!(empty.total_records, 0);
    assert!(empty.groups.is_empty());
}

#[test]
fn test_rental_providers_deduplicated_and_sorted() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repos = create_test_repositories(&db_path).unwrap();
    seed_two_events(&repos);

    repos
        .event_repo
        .upsert(&test_event("ev-3", "OS-2026-33333", date(2026, 4, 1)))
        .unwrap();
    repos
        .order_repo
        .upsert(&test_rental_order(
            "o3",
            "ev-3",
            "prov-1",
            vec![("SILLA", 40, 1.5)],
        ))
        .unwrap();
    repos
        .order_repo
        .upsert(&test_rental_order(
            "o4",
            "ev-3",
            "prov-7",
            vec![("MANTEL", 12, 2.0)],
        ))
        .unwrap();
    ReturnEngine::new(repos.clone()).get_or_init("ev-3").unwrap();

    let engine = IncidentEngine::new(repos);
    assert_eq!(
        engine.rental_providers().unwrap(),
        vec!["prov-1".to_string(), "prov-7".to_string()]
    );
}
