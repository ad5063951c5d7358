//! 通用类型定义
//!
//! 聚合标识使用 UUID v7（时间有序），外部系统下发的标识（用户、卖家、商品）保持字符串

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
        #[serde(transparent)]
        #[display("{_0}")]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
        #[serde(try_from = "String", into = "String")]
        #[display("{_0}")]
        pub struct $name(String);

        // 反序列化同样走 `parse`
        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl $name {
            /// 空白值视为非法
            pub fn parse(value: impl Into<String>) -> Result<Self, String> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(format!("{}는 필수입니다", $label));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

uuid_id!(
    /// 订单 ID
    OrderId
);
uuid_id!(
    /// 订单明细 ID
    OrderItemId
);
uuid_id!(
    /// 支付 ID
    PaymentId
);
uuid_id!(
    /// 库存 ID
    InventoryId
);
uuid_id!(
    /// 库存流水 ID
    InventoryTransactionId
);
uuid_id!(
    /// 结算 ID
    SettlementId
);
uuid_id!(
    /// 结算明细 ID
    SettlementItemId
);

string_id!(
    /// 用户 ID（JWT sub）
    UserId,
    "사용자 ID"
);
string_id!(
    /// 卖家 ID
    SellerId,
    "판매자 ID"
);
string_id!(
    /// 商品 ID
    ProductId,
    "상품 ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_id_roundtrip_through_string() {
        let id = OrderId::new();
        let parsed = OrderId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_uuid_ids_are_time_ordered() {
        let first = PaymentId::new();
        let second = PaymentId::new();
        assert!(first <= second);
    }

    #[test]
    fn test_string_id_rejects_blank() {
        assert!(ProductId::parse("  ").is_err());
        assert_eq!(SellerId::parse("seller-1").unwrap().as_str(), "seller-1");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = UserId::parse("user-7").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user-7\"");
        let back: UserId = serde_json::from_str("\"user-7\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_blank_string_id_fails_to_deserialize() {
        assert!(serde_json::from_str::<ProductId>("\"\"").is_err());
        assert!(serde_json::from_str::<SellerId>("\"   \"").is_err());

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Line {
            #[allow(dead_code)]
            product_id: ProductId,
        }
        let err = serde_json::from_str::<Line>(r#"{"productId": ""}"#).unwrap_err();
        assert!(err.to_string().contains("상품 ID는 필수입니다"));
    }
}
