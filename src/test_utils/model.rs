use serde::Deserialize;
use serde::Serialize;

use crate::NodeSnapshot;
use crate::Stat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestModel {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub age: u32,
    pub salary: u64,
}

impl TestModel {
    pub fn new(
        first_name: &str,
        last_name: &str,
        address: &str,
        age: u32,
        salary: u64,
    ) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            address: address.to_string(),
            age,
            salary,
        }
    }
}

pub(crate) fn snapshot(
    path: &str,
    data: Option<u32>,
) -> NodeSnapshot<u32> {
    NodeSnapshot::new(super::zpath(path), data, Stat::default())
}
