use std::sync::Arc;

use crate::{
    builder::{assert_not_none, Builder, BuilderError},
    devbox::{DevBox, ReadinessPolicy, DEFAULT_IMAGE, DEFAULT_NAME},
    hardware::HardwareDriver,
    keys::KeyStore,
    observer::{Observer, TracingObserver},
    remote::{RemoteConnector, SshConnector},
    software::SoftwareBackend,
};

/// Assemble a [DevBox]. Only the hardware driver is required, every other
/// collaborator defaults to the real implementation.
#[derive(Debug, Default)]
pub struct DevBoxBuilder {
    name: Option<String>,
    image: Option<String>,
    driver: Option<Box<dyn HardwareDriver>>,
    connector: Option<Arc<dyn RemoteConnector>>,
    key_store: Option<KeyStore>,
    observer: Option<Arc<dyn Observer>>,
    readiness: Option<ReadinessPolicy>,
    configurator: Option<SoftwareBackend>,
}

impl DevBoxBuilder {
    pub fn new() -> DevBoxBuilder {
        DevBoxBuilder::default()
    }

    pub fn with_name(mut self, name: String) -> DevBoxBuilder {
        self.name = Some(name);
        self
    }

    pub fn with_image(mut self, image: String) -> DevBoxBuilder {
        self.image = Some(image);
        self
    }

    pub fn with_driver(mut self, driver: Box<dyn HardwareDriver>) -> DevBoxBuilder {
        self.driver = Some(driver);
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> DevBoxBuilder {
        self.connector = Some(connector);
        self
    }

    pub fn with_key_store(mut self, key_store: KeyStore) -> DevBoxBuilder {
        self.key_store = Some(key_store);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> DevBoxBuilder {
        self.observer = Some(observer);
        self
    }

    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> DevBoxBuilder {
        self.readiness = Some(readiness);
        self
    }

    pub fn with_configurator(mut self, configurator: SoftwareBackend) -> DevBoxBuilder {
        self.configurator = Some(configurator);
        self
    }
}

impl Builder<DevBox> for DevBoxBuilder {
    fn try_build(self) -> Result<DevBox, BuilderError> {
        assert_not_none(stringify!(self.driver), &self.driver)?;
        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());
        if name.trim().is_empty() {
            return Err(BuilderError::EmptyField("name".to_string()));
        }
        let driver = self
            .driver
            .ok_or_else(|| BuilderError::MissingRequiredField("driver".to_string()))?;

        Ok(DevBox {
            name,
            image: self.image.unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            driver,
            connector: self
                .connector
                .unwrap_or_else(|| Arc::new(SshConnector::default())),
            key_store: self.key_store.unwrap_or_default(),
            observer: self.observer.unwrap_or_else(|| Arc::new(TracingObserver)),
            readiness: self.readiness.unwrap_or_default(),
            configurator: self.configurator.unwrap_or(SoftwareBackend::Ansible),
        })
    }
}

#[cfg(test)]
mod tests {
    use mystery_box_models::models::VmRecord;

    use super::DevBoxBuilder;
    use crate::{
        builder::{Builder, BuilderError},
        hardware::{DriverError, HardwareDriver, LaunchRequest},
    };

    #[derive(Debug)]
    struct NoDriver;

    impl HardwareDriver for NoDriver {
        fn list(&self) -> Result<Vec<VmRecord>, DriverError> {
            Ok(vec![])
        }
        fn info(&self, _name: &str) -> Result<Option<VmRecord>, DriverError> {
            Ok(None)
        }
        fn launch(&self, _request: &LaunchRequest) -> Result<(), DriverError> {
            Ok(())
        }
        fn stop(&self, _name: &str) -> Result<(), DriverError> {
            Ok(())
        }
        fn start(&self, _name: &str) -> Result<(), DriverError> {
            Ok(())
        }
        fn delete(&self, _name: &str) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[test]
    fn driver_is_required() {
        let err = DevBoxBuilder::new().try_build().unwrap_err();
        assert_eq!(
            err,
            BuilderError::MissingRequiredField("self.driver".to_string())
        );
    }

    #[test]
    fn defaults() {
        let devbox = DevBoxBuilder::new()
            .with_driver(Box::new(NoDriver))
            .try_build()
            .unwrap();
        assert_eq!(devbox.name(), "devbox");
        assert_eq!(devbox.image, "ubuntu");
        assert_eq!(devbox.readiness.attempts, 30);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = DevBoxBuilder::new()
            .with_driver(Box::new(NoDriver))
            .with_name("  ".to_string())
            .try_build()
            .unwrap_err();
        assert_eq!(err, BuilderError::EmptyField("name".to_string()));
    }
}
