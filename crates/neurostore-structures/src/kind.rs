// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Closed sets of record kinds: scientific datatypes, container adapters and index rows.

use crate::{StructureError, StructureResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

macro_rules! define_kind_enum {
    (
        $(#[doc = $enum_doc:expr])*
        $enum_name:ident {
            $( $variant:ident => $name:literal ),* $(,)?
        }
    ) => {
        $(#[doc = $enum_doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $enum_name {
            $( $variant, )*
        }

        impl $enum_name {
            /// Returns every kind, in declaration order.
            pub const fn list_all() -> &'static [$enum_name] {
                &[ $( $enum_name::$variant, )* ]
            }

            pub const fn name(&self) -> &'static str {
                match self {
                    $( $enum_name::$variant => $name, )*
                }
            }

            pub fn from_name(name: &str) -> Option<$enum_name> {
                match name {
                    $( $name => Some($enum_name::$variant), )*
                    _ => None,
                }
            }
        }

        impl Display for $enum_name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = StructureError;

            fn from_str(s: &str) -> StructureResult<Self> {
                $enum_name::from_name(s).ok_or_else(|| StructureError::UnknownKind(s.to_string()))
            }
        }
    };
}

define_kind_enum! {
    /// In-memory scientific record types
    DatatypeKind {
        Connectivity => "Connectivity",
        LocalConnectivity => "LocalConnectivity",
        ProjectionMatrix => "ProjectionMatrix",
        RegionVolumeMapping => "RegionVolumeMapping",
        RegionMapping => "RegionMapping",
        Sensors => "Sensors",
        SimulationState => "SimulationState",
        CoherenceSpectrum => "CoherenceSpectrum",
        ComplexCoherenceSpectrum => "ComplexCoherenceSpectrum",
        FourierSpectrum => "FourierSpectrum",
        WaveletCoefficients => "WaveletCoefficients",
        StructuralMRI => "StructuralMRI",
        Surface => "Surface",
        CrossCorrelation => "CrossCorrelation",
        TimeSeries => "TimeSeries",
        TimeSeriesRegion => "TimeSeriesRegion",
        TimeSeriesSurface => "TimeSeriesSurface",
        TimeSeriesVolume => "TimeSeriesVolume",
        TimeSeriesEEG => "TimeSeriesEEG",
        TimeSeriesMEG => "TimeSeriesMEG",
        TimeSeriesSEEG => "TimeSeriesSEEG",
        Tracts => "Tracts",
        Volume => "Volume",
        PrincipalComponents => "PrincipalComponents",
        IndependentComponents => "IndependentComponents",
        ConnectivityMeasure => "ConnectivityMeasure",
        CorrelationCoefficients => "CorrelationCoefficients",
        Covariance => "Covariance",
        Fcd => "Fcd",
        StimuliRegion => "StimuliRegion",
        StimuliSurface => "StimuliSurface",
        ConnectivityAnnotations => "ConnectivityAnnotations",
        Cortex => "Cortex",
    }
}

define_kind_enum! {
    /// Container adapters. The adapter class path is what a container records in `written_by`.
    AdapterKind {
        Connectivity => "ConnectivityH5",
        LocalConnectivity => "LocalConnectivityH5",
        ProjectionMatrix => "ProjectionMatrixH5",
        RegionVolumeMapping => "RegionVolumeMappingH5",
        RegionMapping => "RegionMappingH5",
        Sensors => "SensorsH5",
        SimulationState => "SimulationStateH5",
        CoherenceSpectrum => "CoherenceSpectrumH5",
        ComplexCoherenceSpectrum => "ComplexCoherenceSpectrumH5",
        FourierSpectrum => "FourierSpectrumH5",
        WaveletCoefficients => "WaveletCoefficientsH5",
        StructuralMRI => "StructuralMRIH5",
        Surface => "SurfaceH5",
        CrossCorrelation => "CrossCorrelationH5",
        TimeSeries => "TimeSeriesH5",
        TimeSeriesRegion => "TimeSeriesRegionH5",
        TimeSeriesSurface => "TimeSeriesSurfaceH5",
        TimeSeriesVolume => "TimeSeriesVolumeH5",
        TimeSeriesEEG => "TimeSeriesEEGH5",
        TimeSeriesMEG => "TimeSeriesMEGH5",
        TimeSeriesSEEG => "TimeSeriesSEEGH5",
        Tracts => "TractsH5",
        Volume => "VolumeH5",
        PrincipalComponents => "PrincipalComponentsH5",
        IndependentComponents => "IndependentComponentsH5",
        ConnectivityMeasure => "ConnectivityMeasureH5",
        CorrelationCoefficients => "CorrelationCoefficientsH5",
        Covariance => "CovarianceH5",
        Fcd => "FcdH5",
        StimuliRegion => "StimuliRegionH5",
        StimuliSurface => "StimuliSurfaceH5",
        DatatypeMeasure => "DatatypeMeasureH5",
        ConnectivityAnnotations => "ConnectivityAnnotationsH5",
        ValueWrapper => "ValueWrapperH5",
        Cortex => "CortexH5",
        BurstConfiguration => "BurstConfigurationH5",
        ViewModel => "ViewModelH5",
    }
}

define_kind_enum! {
    /// Relational index row types
    IndexKind {
        Connectivity => "ConnectivityIndex",
        LocalConnectivity => "LocalConnectivityIndex",
        ProjectionMatrix => "ProjectionMatrixIndex",
        RegionVolumeMapping => "RegionVolumeMappingIndex",
        RegionMapping => "RegionMappingIndex",
        Sensors => "SensorsIndex",
        SimulationState => "SimulationStateIndex",
        CoherenceSpectrum => "CoherenceSpectrumIndex",
        ComplexCoherenceSpectrum => "ComplexCoherenceSpectrumIndex",
        FourierSpectrum => "FourierSpectrumIndex",
        WaveletCoefficients => "WaveletCoefficientsIndex",
        StructuralMRI => "StructuralMRIIndex",
        Surface => "SurfaceIndex",
        CrossCorrelation => "CrossCorrelationIndex",
        TimeSeries => "TimeSeriesIndex",
        TimeSeriesRegion => "TimeSeriesRegionIndex",
        TimeSeriesSurface => "TimeSeriesSurfaceIndex",
        TimeSeriesVolume => "TimeSeriesVolumeIndex",
        TimeSeriesEEG => "TimeSeriesEEGIndex",
        TimeSeriesMEG => "TimeSeriesMEGIndex",
        TimeSeriesSEEG => "TimeSeriesSEEGIndex",
        Tracts => "TractsIndex",
        Volume => "VolumeIndex",
        PrincipalComponents => "PrincipalComponentsIndex",
        IndependentComponents => "IndependentComponentsIndex",
        ConnectivityMeasure => "ConnectivityMeasureIndex",
        CorrelationCoefficients => "CorrelationCoefficientsIndex",
        Covariance => "CovarianceIndex",
        Fcd => "FcdIndex",
        StimuliRegion => "StimuliRegionIndex",
        StimuliSurface => "StimuliSurfaceIndex",
        DatatypeMeasure => "DatatypeMeasureIndex",
        ConnectivityAnnotations => "ConnectivityAnnotationsIndex",
        ValueWrapper => "ValueWrapperIndex",
    }
}

/// Package prefix of adapter class paths recorded in `written_by`
pub const ADAPTER_PACKAGE: &str = "neurostore.adapters";

impl AdapterKind {
    /// Module segment of the class path
    pub const fn module_name(&self) -> &'static str {
        match self {
            AdapterKind::Connectivity => "connectivity_h5",
            AdapterKind::LocalConnectivity => "local_connectivity_h5",
            AdapterKind::ProjectionMatrix => "projections_h5",
            AdapterKind::RegionVolumeMapping | AdapterKind::RegionMapping => "region_mapping_h5",
            AdapterKind::Sensors => "sensors_h5",
            AdapterKind::SimulationState => "simulation_state_h5",
            AdapterKind::CoherenceSpectrum
            | AdapterKind::ComplexCoherenceSpectrum
            | AdapterKind::FourierSpectrum
            | AdapterKind::WaveletCoefficients => "spectral_h5",
            AdapterKind::StructuralMRI => "structural_h5",
            AdapterKind::Surface => "surface_h5",
            AdapterKind::CrossCorrelation => "temporal_correlations_h5",
            AdapterKind::TimeSeries
            | AdapterKind::TimeSeriesRegion
            | AdapterKind::TimeSeriesSurface
            | AdapterKind::TimeSeriesVolume
            | AdapterKind::TimeSeriesEEG
            | AdapterKind::TimeSeriesMEG
            | AdapterKind::TimeSeriesSEEG => "time_series_h5",
            AdapterKind::Tracts => "tracts_h5",
            AdapterKind::Volume => "volumes_h5",
            AdapterKind::PrincipalComponents | AdapterKind::IndependentComponents => {
                "mode_decompositions_h5"
            }
            AdapterKind::ConnectivityMeasure
            | AdapterKind::CorrelationCoefficients
            | AdapterKind::Covariance => "graph_h5",
            AdapterKind::Fcd => "fcd_h5",
            AdapterKind::StimuliRegion | AdapterKind::StimuliSurface => "patterns_h5",
            AdapterKind::DatatypeMeasure | AdapterKind::ValueWrapper => "mapped_value_h5",
            AdapterKind::ConnectivityAnnotations => "annotation_h5",
            AdapterKind::Cortex => "cortex_h5",
            AdapterKind::BurstConfiguration => "burst_configuration_h5",
            AdapterKind::ViewModel => "view_model_h5",
        }
    }

    /// Fully qualified class path, e.g. `neurostore.adapters.connectivity_h5.ConnectivityH5`
    pub fn class_path(&self) -> String {
        format!("{}.{}.{}", ADAPTER_PACKAGE, self.module_name(), self.name())
    }

    /// Resolve a `written_by` value. Only the trailing class name is significant, so
    /// class paths from older package layouts resolve too.
    pub fn from_class_path(path: &str) -> Option<AdapterKind> {
        let class_name = path.rsplit('.').next().unwrap_or(path);
        AdapterKind::from_name(class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_lookup() {
        for kind in DatatypeKind::list_all() {
            assert_eq!(DatatypeKind::from_name(kind.name()), Some(*kind));
        }
        for kind in IndexKind::list_all() {
            assert_eq!(kind.name().parse::<IndexKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_adapter_class_path() {
        let path = AdapterKind::ProjectionMatrix.class_path();
        assert_eq!(path, "neurostore.adapters.projections_h5.ProjectionMatrixH5");
        assert_eq!(
            AdapterKind::from_class_path(&path),
            Some(AdapterKind::ProjectionMatrix)
        );
        assert_eq!(
            AdapterKind::from_class_path("tvb.adapters.datatypes.h5.mapped_value_h5.ValueWrapperH5"),
            Some(AdapterKind::ValueWrapper)
        );
        assert_eq!(AdapterKind::from_class_path("nothing.Here"), None);
    }

    #[test]
    fn test_unknown_kind_error() {
        let err = "Brain".parse::<DatatypeKind>().unwrap_err();
        assert_eq!(err, StructureError::UnknownKind("Brain".into()));
    }
}
