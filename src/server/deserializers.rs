use serde::{Deserialize, Deserializer};

// The quiz front-end keeps asked ids in whatever form it read them, so a list
// may mix numbers and numeric strings
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

pub fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<RawId>::deserialize(deserializer)?
        .into_iter()
        .map(|raw| match raw {
            RawId::Number(id) => Ok(id),
            RawId::Text(value) => value.trim().parse::<i64>().map_err(|_| {
                serde::de::Error::custom(format!("Wrong value {value}, can not parse to i64"))
            }),
        })
        .collect()
}
