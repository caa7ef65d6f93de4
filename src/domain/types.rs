// ==========================================
// 餐饮仓库引擎 - 领域类型定义
// ==========================================
// 序列化格式: 与持久化文档一致的西语字符串
// 红线: 枚举字符串是存储契约的一部分, 不做本地化
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单类型 (Order Type)
// ==========================================
// 五类物料订单, 决定需求分桶与退库预填规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Almacen,  // 仓库耗材
    Bodega,   // 酒水
    Bio,      // 生鲜
    Alquiler, // 租赁器材
    Hielo,    // 冰块
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderType {
    /// 从字符串解析订单类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Almacen" => Some(OrderType::Almacen),
            "Bodega" => Some(OrderType::Bodega),
            "Bio" => Some(OrderType::Bio),
            "Alquiler" => Some(OrderType::Alquiler),
            "Hielo" => Some(OrderType::Hielo),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderType::Almacen => "Almacen",
            OrderType::Bodega => "Bodega",
            OrderType::Bio => "Bio",
            OrderType::Alquiler => "Alquiler",
            OrderType::Hielo => "Hielo",
        }
    }

    /// 全部订单类型 (固定展示顺序)
    pub fn all() -> [OrderType; 5] {
        [
            OrderType::Almacen,
            OrderType::Bodega,
            OrderType::Bio,
            OrderType::Alquiler,
            OrderType::Hielo,
        ]
    }
}

// ==========================================
// 拣货单状态 (Picking Status)
// ==========================================
// 状态机: Pendiente -> Listo (finalize 需通过完备性门槛)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickingStatus {
    Pendiente, // 拣货中
    Listo,     // 已完成
}

impl fmt::Display for PickingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PickingStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s {
            "Listo" => PickingStatus::Listo,
            _ => PickingStatus::Pendiente, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PickingStatus::Pendiente => "Pendiente",
            PickingStatus::Listo => "Listo",
        }
    }
}

// ==========================================
// 退库单状态 (Return Status)
// ==========================================
// 状态机: Pendiente -> Procesando -> Completado
// 红线: Pendiente -> Procesando 为单向提升, complete 无门槛
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnStatus {
    Pendiente,  // 未开始盘点
    Procesando, // 盘点进行中
    Completado, // 已完成
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ReturnStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s {
            "Procesando" => ReturnStatus::Procesando,
            "Completado" => ReturnStatus::Completado,
            _ => ReturnStatus::Pendiente, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pendiente => "Pendiente",
            ReturnStatus::Procesando => "Procesando",
            ReturnStatus::Completado => "Completado",
        }
    }
}

// ==========================================
// 拣货需求方 (Requested By)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestedBy {
    Sala,   // 前厅
    Cocina, // 后厨
}

impl fmt::Display for RequestedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl RequestedBy {
    /// 从字符串解析需求方
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Sala" => Some(RequestedBy::Sala),
            "Cocina" => Some(RequestedBy::Cocina),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RequestedBy::Sala => "Sala",
            RequestedBy::Cocina => "Cocina",
        }
    }
}

// ==========================================
// 活动订单有效状态
// ==========================================
// 只有 Confirmado 的活动参与需求汇总
pub const EVENT_STATUS_CONFIRMED: &str = "Confirmado";
