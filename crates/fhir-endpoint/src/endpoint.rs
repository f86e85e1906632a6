//! Endpoint setup and invocation.
//!
//! A [`FhirComponent`] owns the shared [`FhirConnection`] and turns
//! endpoint URIs into [`FhirEndpoint`]s. Setup has two phases:
//!
//! 1. [`FhirComponent::plan`] parses the URI and sorts every option into
//!    configuration overrides, extra parameters, endpoint settings or
//!    method arguments. It needs no connection.
//! 2. [`EndpointPlan::build`] obtains the shared client and binds the
//!    facade for the addressed API.
//!
//! Options that are none of the above are collected as unrecognized extra
//! parameters, and planning fails with
//! [`ExtraParameterError::UnknownParameter`](crate::error::ExtraParameterError::UnknownParameter).

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::arguments::{to_count, to_flag, to_text};
use crate::api::{ApiMethod, ApiName, ApiOutput, ApiProxy, ArgumentBag};
use crate::client::GenericClient;
use crate::config::{FhirConfiguration, FhirConnection, Properties};
use crate::error::{ConfigurationError, EndpointResult};
use crate::extra_parameters::{ExtraParameter, ExtraParameters};
use crate::uri::EndpointUri;

/// Argument (and URI option) holding extra parameters as a JSON object.
pub const EXTRA_PARAMETERS_ARGUMENT: &str = "extraParameters";

const DEFAULT_DELAY_MS: u64 = 500;
const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

/// Options that shape how producers and consumers drive an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSettings {
    /// The argument a producer fills from the message body.
    pub in_body: Option<String>,
    /// Milliseconds between consumer polls.
    pub delay: u64,
    /// Milliseconds before the first consumer poll.
    pub initial_delay: u64,
    /// Emit one message per resource instead of one per result.
    pub split_result: bool,
}

impl EndpointSettings {
    /// Option keys consumed as endpoint settings.
    pub const OPTION_KEYS: [&'static str; 4] = ["inBody", "delay", "initialDelay", "splitResult"];

    /// Removes the settings keys from `options`.
    fn take(options: &mut Properties, overloads: &[ApiMethod]) -> Result<Self, ConfigurationError> {
        let invalid = |option: &str, message: String| ConfigurationError::InvalidOption {
            option: option.to_string(),
            message,
        };

        let mut settings = Self::default();

        if let Some(value) = options.remove("inBody") {
            let name = to_text(&value).map_err(|m| invalid("inBody", m))?;
            if !overloads.iter().any(|method| method.argument(&name).is_some()) {
                return Err(invalid(
                    "inBody",
                    format!("'{}' is not an argument of this method", name),
                ));
            }
            settings.in_body = Some(name);
        }
        if let Some(value) = options.remove("delay") {
            settings.delay = to_count(&value).map_err(|m| invalid("delay", m))?.into();
        }
        if let Some(value) = options.remove("initialDelay") {
            settings.initial_delay = to_count(&value)
                .map_err(|m| invalid("initialDelay", m))?
                .into();
        }
        if let Some(value) = options.remove("splitResult") {
            settings.split_result = to_flag(&value).map_err(|m| invalid("splitResult", m))?;
        }

        Ok(settings)
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            in_body: None,
            delay: DEFAULT_DELAY_MS,
            initial_delay: DEFAULT_INITIAL_DELAY_MS,
            split_result: false,
        }
    }
}

/// Creates endpoints that share one configuration and one client.
#[derive(Debug, Clone)]
pub struct FhirComponent {
    connection: Arc<FhirConnection>,
}

impl FhirComponent {
    /// Creates a component around `configuration`.
    pub fn new(configuration: FhirConfiguration) -> Self {
        Self {
            connection: Arc::new(FhirConnection::new(configuration)),
        }
    }

    /// Returns the component configuration.
    pub fn configuration(&self) -> &Arc<FhirConfiguration> {
        self.connection.configuration()
    }

    /// Returns the connection endpoints without configuration overrides share.
    pub fn connection(&self) -> &Arc<FhirConnection> {
        &self.connection
    }

    /// Parses and checks an endpoint URI without connecting.
    pub fn plan(&self, uri: &str) -> EndpointResult<EndpointPlan> {
        let EndpointUri {
            api,
            method,
            mut options,
        } = EndpointUri::parse(uri)?;

        let overloads = ApiMethod::candidates(api, &method);
        if overloads.is_empty() {
            return Err(ConfigurationError::UnknownMethod {
                api: api.to_string(),
                method,
            }
            .into());
        }

        let mut extra_parameters = ExtraParameters::from_properties(&options);
        if let Some(value) = options.remove(EXTRA_PARAMETERS_ARGUMENT) {
            extra_parameters = extra_parameters.merged(&ExtraParameters::from_json(&value)?);
        }

        let configuration_overrides: Vec<String> = options
            .keys()
            .filter(|key| FhirConfiguration::is_option(key))
            .cloned()
            .collect();
        let connection = if configuration_overrides.is_empty() {
            Arc::clone(&self.connection)
        } else {
            let overridden = self.configuration().with_overrides(&options)?;
            Arc::new(FhirConnection::new(overridden))
        };
        connection
            .configuration()
            .validate()
            .map_err(|problems| ConfigurationError::InvalidOption {
                option: "configuration".to_string(),
                message: problems.join("; "),
            })?;

        let settings = EndpointSettings::take(&mut options, &overloads)?;

        let mut arguments = Properties::new();
        for (key, value) in options {
            if FhirConfiguration::is_option(&key) || ExtraParameter::from_key(&key).is_some() {
                continue;
            }
            match overloads.iter().find_map(|overload| overload.argument(&key)) {
                Some(spec) => {
                    spec.kind
                        .check(&value)
                        .map_err(|message| ConfigurationError::InvalidArgument {
                            argument: key.clone(),
                            message,
                        })?;
                    arguments.insert(key, value);
                }
                None => {
                    warn!(
                        option = %key,
                        api = %api,
                        method = %method,
                        "Unrecognized endpoint option"
                    );
                    extra_parameters.insert_key(&key, value);
                }
            }
        }

        extra_parameters.validate()?;

        Ok(EndpointPlan {
            uri: uri.to_string(),
            api,
            method,
            overloads: overloads.iter().map(ApiMethod::signature).collect(),
            arguments,
            extra_parameters,
            configuration_overrides,
            settings,
            connection,
        })
    }

    /// Parses an endpoint URI and binds it to the shared client.
    pub fn create_endpoint(&self, uri: &str) -> EndpointResult<FhirEndpoint> {
        self.plan(uri)?.build()
    }
}

/// A checked endpoint that has not yet been bound to a client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPlan {
    /// The URI the plan was made from.
    pub uri: String,
    /// The addressed API.
    pub api: ApiName,
    /// The method name.
    pub method: String,
    /// Every overload the method name may resolve to.
    pub overloads: Vec<String>,
    /// Arguments fixed by the URI.
    pub arguments: Properties,
    /// Extra parameters applied to every request.
    pub extra_parameters: ExtraParameters,
    /// Configuration options the URI overrides.
    pub configuration_overrides: Vec<String>,
    /// Producer and consumer settings.
    pub settings: EndpointSettings,
    #[serde(skip)]
    connection: Arc<FhirConnection>,
}

impl EndpointPlan {
    /// Returns the overload the URI arguments alone select, if any.
    pub fn resolve_with_uri_arguments(&self) -> Option<ApiMethod> {
        ApiMethod::resolve(self.api, &self.method, |name| {
            self.arguments.get(name).is_some_and(|value| !value.is_null())
        })
        .ok()
    }

    /// Returns the configuration the endpoint will use.
    pub fn configuration(&self) -> &Arc<FhirConfiguration> {
        self.connection.configuration()
    }

    /// Obtains the shared client and binds the facade.
    pub fn build(self) -> EndpointResult<FhirEndpoint> {
        let client = self.connection.generic_client()?;
        let proxy = ApiProxy::new(self.api, client);

        info!(
            api = %self.api,
            method = %self.method,
            extra_parameters = self.extra_parameters.len(),
            "Created FHIR endpoint"
        );

        Ok(FhirEndpoint {
            uri: self.uri,
            method: self.method,
            arguments: ArgumentBag::from(self.arguments),
            extra_parameters: Arc::new(self.extra_parameters),
            settings: self.settings,
            configuration: Arc::clone(self.connection.configuration()),
            proxy,
        })
    }
}

/// An endpoint bound to its facade.
#[derive(Debug, Clone)]
pub struct FhirEndpoint {
    uri: String,
    method: String,
    arguments: ArgumentBag,
    extra_parameters: Arc<ExtraParameters>,
    settings: EndpointSettings,
    configuration: Arc<FhirConfiguration>,
    proxy: ApiProxy,
}

impl FhirEndpoint {
    /// The endpoint URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The addressed API.
    pub fn api(&self) -> ApiName {
        self.proxy.api()
    }

    /// The method name.
    pub fn method_name(&self) -> &str {
        &self.method
    }

    /// Arguments fixed by the URI.
    pub fn arguments(&self) -> &ArgumentBag {
        &self.arguments
    }

    /// Extra parameters applied to every request.
    pub fn extra_parameters(&self) -> &Arc<ExtraParameters> {
        &self.extra_parameters
    }

    /// Producer and consumer settings.
    pub fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    /// The configuration the endpoint was built from.
    pub fn configuration(&self) -> &Arc<FhirConfiguration> {
        &self.configuration
    }

    /// The facade the endpoint delegates to.
    pub fn proxy(&self) -> &ApiProxy {
        &self.proxy
    }

    /// The shared client.
    pub fn client(&self) -> &Arc<dyn GenericClient> {
        self.proxy.client()
    }

    /// Invokes the endpoint method.
    ///
    /// `args` are merged over the URI arguments. An `extraParameters`
    /// argument is merged over the endpoint's extra parameters for this call
    /// only.
    pub fn invoke(&self, args: &ArgumentBag) -> EndpointResult<ApiOutput> {
        let mut merged = self.arguments.clone();
        merged.extend(args.iter().map(|(name, value)| (name.to_string(), value.clone())));

        let call_extra = merged
            .remove(EXTRA_PARAMETERS_ARGUMENT)
            .filter(|value| !value.is_null())
            .map(|value: Value| ExtraParameters::from_json(&value))
            .transpose()?;
        let extra = match &call_extra {
            Some(call) => Cow::Owned(self.extra_parameters.merged(call)),
            None => Cow::Borrowed(self.extra_parameters.as_ref()),
        };

        let method = ApiMethod::resolve(self.api(), &self.method, |name| merged.contains(name))?;
        debug!(
            method = %method,
            arguments = merged.len(),
            extra_parameters = extra.len(),
            "Invoking FHIR method"
        );

        method.invoke(&self.proxy, &merged, Some(&*extra))
    }
}
