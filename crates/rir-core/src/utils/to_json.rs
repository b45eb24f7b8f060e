use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub trait ToJson {
    fn to_json(&self) -> crate::error::Result<Value>;

    fn to_value<T: DeserializeOwned>(&self) -> crate::error::Result<T>
    where
        Self: Sized,
    {
        let json = self.to_json()?;
        serde_json::from_value(json).map_err(crate::Error::from)
    }
}

impl<T: Serialize> ToJson for T {
    fn to_json(&self) -> crate::error::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
