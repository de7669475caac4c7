// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The closed set of record kinds a schema 4 container can declare in its `type`
//! attribute, and the schema 5 adapter each one migrates to.

use crate::{MigrationError, MigrationResult};
use neurostore_structures::{AdapterKind, DatatypeRegistry};
use std::fmt::{Display, Formatter};

macro_rules! define_legacy_kinds {
    ( $( $variant:ident => $name:literal => $successor:expr ),* $(,)? ) => {
        /// Record kind as declared by a schema 4 container
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum LegacyKind {
            $( $variant, )*
        }

        impl LegacyKind {
            pub const fn list_all() -> &'static [LegacyKind] {
                &[ $( LegacyKind::$variant, )* ]
            }

            /// Class name as written in the legacy `type` attribute
            pub const fn class_name(&self) -> &'static str {
                match self {
                    $( LegacyKind::$variant => $name, )*
                }
            }

            pub fn from_class_name(name: &str) -> Option<LegacyKind> {
                match name.trim().trim_matches('"') {
                    $( $name => Some(LegacyKind::$variant), )*
                    _ => None,
                }
            }

            /// Adapter of the schema 5 successor. `None` for kinds that are dropped.
            pub const fn successor(&self) -> Option<AdapterKind> {
                match self {
                    $( LegacyKind::$variant => $successor, )*
                }
            }
        }
    };
}

define_legacy_kinds! {
    Connectivity => "Connectivity" => Some(AdapterKind::Connectivity),
    BrainSkull => "BrainSkull" => Some(AdapterKind::Surface),
    CorticalSurface => "CorticalSurface" => Some(AdapterKind::Surface),
    SkinAir => "SkinAir" => Some(AdapterKind::Surface),
    SkullSkin => "SkullSkin" => Some(AdapterKind::Surface),
    EEGCap => "EEGCap" => Some(AdapterKind::Surface),
    FaceSurface => "FaceSurface" => Some(AdapterKind::Surface),
    RegionMapping => "RegionMapping" => Some(AdapterKind::RegionMapping),
    RegionVolumeMapping => "RegionVolumeMapping" => Some(AdapterKind::RegionVolumeMapping),
    SensorsEEG => "SensorsEEG" => Some(AdapterKind::Sensors),
    SensorsMEG => "SensorsMEG" => Some(AdapterKind::Sensors),
    SensorsInternal => "SensorsInternal" => Some(AdapterKind::Sensors),
    ProjectionSurfaceEEG => "ProjectionSurfaceEEG" => Some(AdapterKind::ProjectionMatrix),
    ProjectionSurfaceMEG => "ProjectionSurfaceMEG" => Some(AdapterKind::ProjectionMatrix),
    ProjectionSurfaceSEEG => "ProjectionSurfaceSEEG" => Some(AdapterKind::ProjectionMatrix),
    LocalConnectivity => "LocalConnectivity" => Some(AdapterKind::LocalConnectivity),
    ConnectivityAnnotations => "ConnectivityAnnotations" => Some(AdapterKind::ConnectivityAnnotations),
    TimeSeries => "TimeSeries" => Some(AdapterKind::TimeSeries),
    TimeSeriesRegion => "TimeSeriesRegion" => Some(AdapterKind::TimeSeriesRegion),
    TimeSeriesSurface => "TimeSeriesSurface" => Some(AdapterKind::TimeSeriesSurface),
    TimeSeriesVolume => "TimeSeriesVolume" => Some(AdapterKind::TimeSeriesVolume),
    TimeSeriesEEG => "TimeSeriesEEG" => Some(AdapterKind::TimeSeriesEEG),
    TimeSeriesMEG => "TimeSeriesMEG" => Some(AdapterKind::TimeSeriesMEG),
    TimeSeriesSEEG => "TimeSeriesSEEG" => Some(AdapterKind::TimeSeriesSEEG),
    Volume => "Volume" => Some(AdapterKind::Volume),
    StructuralMRI => "StructuralMRI" => Some(AdapterKind::StructuralMRI),
    ComplexCoherenceSpectrum => "ComplexCoherenceSpectrum" => Some(AdapterKind::ComplexCoherenceSpectrum),
    WaveletCoefficients => "WaveletCoefficients" => Some(AdapterKind::WaveletCoefficients),
    CoherenceSpectrum => "CoherenceSpectrum" => Some(AdapterKind::CoherenceSpectrum),
    CrossCorrelation => "CrossCorrelation" => Some(AdapterKind::CrossCorrelation),
    Fcd => "Fcd" => Some(AdapterKind::Fcd),
    FourierSpectrum => "FourierSpectrum" => Some(AdapterKind::FourierSpectrum),
    IndependentComponents => "IndependentComponents" => Some(AdapterKind::IndependentComponents),
    CorrelationCoefficients => "CorrelationCoefficients" => Some(AdapterKind::CorrelationCoefficients),
    PrincipalComponents => "PrincipalComponents" => Some(AdapterKind::PrincipalComponents),
    Covariance => "Covariance" => Some(AdapterKind::Covariance),
    ConnectivityMeasure => "ConnectivityMeasure" => Some(AdapterKind::ConnectivityMeasure),
    DatatypeMeasure => "DatatypeMeasure" => Some(AdapterKind::DatatypeMeasure),
    StimuliRegion => "StimuliRegion" => Some(AdapterKind::StimuliRegion),
    StimuliSurface => "StimuliSurface" => Some(AdapterKind::StimuliSurface),
    ValueWrapper => "ValueWrapper" => Some(AdapterKind::ValueWrapper),
    SimulationState => "SimulationState" => None,
}

impl LegacyKind {
    pub fn is_time_series(&self) -> bool {
        matches!(
            self,
            LegacyKind::TimeSeries
                | LegacyKind::TimeSeriesRegion
                | LegacyKind::TimeSeriesSurface
                | LegacyKind::TimeSeriesVolume
                | LegacyKind::TimeSeriesEEG
                | LegacyKind::TimeSeriesMEG
                | LegacyKind::TimeSeriesSEEG
        )
    }

    /// Successor adapter, failing for kinds that are dropped.
    pub fn require_successor(&self) -> MigrationResult<AdapterKind> {
        self.successor()
            .ok_or_else(|| MigrationError::UnregisteredSuccessor {
                kind: self.class_name().to_string(),
                reason: "kind is dropped in schema 5".to_string(),
            })
    }
}

impl Display for LegacyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.class_name())
    }
}

/// Check that every legacy kind with a successor can be materialised: its adapter is
/// registered and maps to an index row type.
///
/// Run once at startup so an unhandled kind fails before any container is touched.
pub fn validate_against_registry(registry: &DatatypeRegistry) -> MigrationResult<()> {
    for kind in LegacyKind::list_all() {
        let Some(adapter) = kind.successor() else {
            continue;
        };
        if !registry.is_adapter_registered(adapter) {
            return Err(MigrationError::UnregisteredSuccessor {
                kind: kind.class_name().to_string(),
                reason: format!("adapter {} is not registered", adapter),
            });
        }
        registry
            .index_for_adapter(adapter)
            .map_err(|e| MigrationError::UnregisteredSuccessor {
                kind: kind.class_name().to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}
