//! Extended operation facade.
//!
//! Invokes [extended operations](https://hl7.org/fhir/operations.html)
//! (`$everything`, `$expand`, ...) at server, type, instance and
//! instance-version level, plus `$process-message`.

use std::sync::Arc;

use tracing::debug;

use crate::client::{GenericClient, OperationScope, RequestBuilder};
use crate::error::{ConfigurationError, EndpointResult};
use crate::extra_parameters::ExtraParameters;
use crate::model::{Bundle, IdType, Resource};

/// Invokes extended operations.
#[derive(Clone)]
pub struct FhirOperation {
    client: Arc<dyn GenericClient>,
}

impl FhirOperation {
    /// Creates a facade bound to `client`.
    pub fn new(client: Arc<dyn GenericClient>) -> Self {
        Self { client }
    }

    /// Returns the shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        &self.client
    }

    /// `[base]/$name`
    pub fn on_server(
        &self,
        name: &str,
        parameters: Option<Resource>,
        use_http_get: bool,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Resource> {
        self.invoke(OperationScope::Server, name, parameters, use_http_get, extra_parameters)
    }

    /// `[base]/[type]/$name`
    pub fn on_type(
        &self,
        resource_type: &str,
        name: &str,
        parameters: Option<Resource>,
        use_http_get: bool,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Resource> {
        self.invoke(
            OperationScope::Type(resource_type.to_string()),
            name,
            parameters,
            use_http_get,
            extra_parameters,
        )
    }

    /// `[base]/[type]/[id]/$name`
    pub fn on_instance(
        &self,
        id: IdType,
        name: &str,
        parameters: Option<Resource>,
        use_http_get: bool,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Resource> {
        self.invoke(
            OperationScope::Instance(id),
            name,
            parameters,
            use_http_get,
            extra_parameters,
        )
    }

    /// `[base]/[type]/[id]/_history/[vid]/$name`
    ///
    /// The id must carry a version.
    pub fn on_instance_version(
        &self,
        id: IdType,
        name: &str,
        parameters: Option<Resource>,
        use_http_get: bool,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Resource> {
        if id.version().is_none() {
            return Err(ConfigurationError::InvalidArgument {
                argument: "id".to_string(),
                message: format!("'{}' has no version", id),
            }
            .into());
        }
        self.invoke(
            OperationScope::InstanceVersion(id),
            name,
            parameters,
            use_http_get,
            extra_parameters,
        )
    }

    /// `POST [base]/$process-message`
    pub fn process_message(
        &self,
        message: Bundle,
        respond_to_uri: Option<&str>,
        asynchronous: bool,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Resource> {
        debug!(
            respond_to = respond_to_uri.unwrap_or_default(),
            asynchronous,
            "Processing $process-message request"
        );

        let mut process = self.client.process_message(message);
        if let Some(uri) = respond_to_uri {
            process.respond_to_uri(uri);
        }
        process.asynchronous(asynchronous);
        ExtraParameters::process(
            extra_parameters,
            RequestBuilder::ProcessMessage(process.as_mut()),
        )?;
        Ok(process.execute()?)
    }

    fn invoke(
        &self,
        scope: OperationScope,
        name: &str,
        parameters: Option<Resource>,
        use_http_get: bool,
        extra_parameters: Option<&ExtraParameters>,
    ) -> EndpointResult<Resource> {
        let name = operation_name(name)?;
        debug!(scope = ?scope, operation = %name, use_http_get, "Processing operation request");

        let mut operation = self.client.operation(scope, &name, parameters);
        if use_http_get {
            operation.use_http_get();
        }
        ExtraParameters::process(extra_parameters, RequestBuilder::Operation(operation.as_mut()))?;
        Ok(operation.execute()?)
    }
}

/// Normalizes an operation name to its `$`-prefixed form.
fn operation_name(name: &str) -> Result<String, ConfigurationError> {
    let bare = name.trim().trim_start_matches('$');
    if bare.is_empty() {
        return Err(ConfigurationError::InvalidArgument {
            argument: "name".to_string(),
            message: "operation name is empty".to_string(),
        });
    }
    Ok(format!("${}", bare))
}
