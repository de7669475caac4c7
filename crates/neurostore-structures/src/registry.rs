// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bidirectional mapping between scientific records, container adapters and index rows.
//!
//! The registry is assembled once through [`RegistryBuilder`] and then frozen. Components
//! receive `&DatatypeRegistry`; there is no global instance and no way to register after
//! [`RegistryBuilder::build`].

use crate::kind::{AdapterKind, DatatypeKind, IndexKind};
use crate::{RegistryError, RegistryResult};
use ahash::AHashMap;

/// One `register_datatype` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub datatype: Option<DatatypeKind>,
    pub adapter: AdapterKind,
    pub index: Option<IndexKind>,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registrations: Vec<Registration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one pairing. Either the scientific type or the index type may be absent,
    /// but no kind may be registered twice.
    pub fn register_datatype(
        mut self,
        datatype: Option<DatatypeKind>,
        adapter: AdapterKind,
        index: Option<IndexKind>,
    ) -> RegistryResult<Self> {
        for existing in &self.registrations {
            if existing.adapter == adapter {
                return Err(RegistryError::Duplicate(adapter.name().to_string()));
            }
            if datatype.is_some() && existing.datatype == datatype {
                return Err(RegistryError::Duplicate(format!("{:?}", datatype)));
            }
            if index.is_some() && existing.index == index {
                return Err(RegistryError::Duplicate(format!("{:?}", index)));
            }
        }
        self.registrations.push(Registration {
            datatype,
            adapter,
            index,
        });
        Ok(self)
    }

    pub fn build(self) -> DatatypeRegistry {
        let mut registry = DatatypeRegistry {
            registrations: Vec::with_capacity(self.registrations.len()),
            by_datatype: AHashMap::new(),
            by_adapter: AHashMap::new(),
        };
        for (position, registration) in self.registrations.into_iter().enumerate() {
            if let Some(datatype) = registration.datatype {
                registry.by_datatype.insert(datatype, position);
            }
            registry.by_adapter.insert(registration.adapter, position);
            registry.registrations.push(registration);
        }
        registry
    }
}

/// Frozen registry
#[derive(Debug, Clone)]
pub struct DatatypeRegistry {
    registrations: Vec<Registration>,
    by_datatype: AHashMap<DatatypeKind, usize>,
    by_adapter: AHashMap<AdapterKind, usize>,
}

impl DatatypeRegistry {
    /// Registry of every datatype shipped with the framework.
    pub fn standard() -> RegistryResult<Self> {
        use AdapterKind as A;
        use DatatypeKind as D;
        use IndexKind as I;

        let pairings: [(Option<D>, A, Option<I>); 35] = [
            (Some(D::Connectivity), A::Connectivity, Some(I::Connectivity)),
            (Some(D::LocalConnectivity), A::LocalConnectivity, Some(I::LocalConnectivity)),
            (Some(D::ProjectionMatrix), A::ProjectionMatrix, Some(I::ProjectionMatrix)),
            (Some(D::RegionVolumeMapping), A::RegionVolumeMapping, Some(I::RegionVolumeMapping)),
            (Some(D::RegionMapping), A::RegionMapping, Some(I::RegionMapping)),
            (Some(D::Sensors), A::Sensors, Some(I::Sensors)),
            (Some(D::SimulationState), A::SimulationState, Some(I::SimulationState)),
            (Some(D::CoherenceSpectrum), A::CoherenceSpectrum, Some(I::CoherenceSpectrum)),
            (
                Some(D::ComplexCoherenceSpectrum),
                A::ComplexCoherenceSpectrum,
                Some(I::ComplexCoherenceSpectrum),
            ),
            (Some(D::FourierSpectrum), A::FourierSpectrum, Some(I::FourierSpectrum)),
            (Some(D::WaveletCoefficients), A::WaveletCoefficients, Some(I::WaveletCoefficients)),
            (Some(D::StructuralMRI), A::StructuralMRI, Some(I::StructuralMRI)),
            (Some(D::Surface), A::Surface, Some(I::Surface)),
            (Some(D::CrossCorrelation), A::CrossCorrelation, Some(I::CrossCorrelation)),
            (Some(D::TimeSeries), A::TimeSeries, Some(I::TimeSeries)),
            (Some(D::TimeSeriesRegion), A::TimeSeriesRegion, Some(I::TimeSeriesRegion)),
            (Some(D::TimeSeriesSurface), A::TimeSeriesSurface, Some(I::TimeSeriesSurface)),
            (Some(D::TimeSeriesVolume), A::TimeSeriesVolume, Some(I::TimeSeriesVolume)),
            (Some(D::TimeSeriesEEG), A::TimeSeriesEEG, Some(I::TimeSeriesEEG)),
            (Some(D::TimeSeriesMEG), A::TimeSeriesMEG, Some(I::TimeSeriesMEG)),
            (Some(D::TimeSeriesSEEG), A::TimeSeriesSEEG, Some(I::TimeSeriesSEEG)),
            (Some(D::Tracts), A::Tracts, Some(I::Tracts)),
            (Some(D::Volume), A::Volume, Some(I::Volume)),
            (Some(D::PrincipalComponents), A::PrincipalComponents, Some(I::PrincipalComponents)),
            (
                Some(D::IndependentComponents),
                A::IndependentComponents,
                Some(I::IndependentComponents),
            ),
            (Some(D::ConnectivityMeasure), A::ConnectivityMeasure, Some(I::ConnectivityMeasure)),
            (
                Some(D::CorrelationCoefficients),
                A::CorrelationCoefficients,
                Some(I::CorrelationCoefficients),
            ),
            (Some(D::Covariance), A::Covariance, Some(I::Covariance)),
            (Some(D::Fcd), A::Fcd, Some(I::Fcd)),
            (Some(D::StimuliRegion), A::StimuliRegion, Some(I::StimuliRegion)),
            (Some(D::StimuliSurface), A::StimuliSurface, Some(I::StimuliSurface)),
            (None, A::DatatypeMeasure, Some(I::DatatypeMeasure)),
            (
                Some(D::ConnectivityAnnotations),
                A::ConnectivityAnnotations,
                Some(I::ConnectivityAnnotations),
            ),
            (None, A::ValueWrapper, Some(I::ValueWrapper)),
            (Some(D::Cortex), A::Cortex, None),
        ];

        let mut builder = RegistryBuilder::new();
        for (datatype, adapter, index) in pairings {
            builder = builder.register_datatype(datatype, adapter, index)?;
        }
        Ok(builder.build())
    }

    pub fn adapter_for_datatype(&self, datatype: DatatypeKind) -> RegistryResult<AdapterKind> {
        self.by_datatype
            .get(&datatype)
            .map(|position| self.registrations[*position].adapter)
            .ok_or_else(|| RegistryError::NotRegistered {
                lookup: "adapter_for_datatype",
                key: datatype.name().to_string(),
            })
    }

    pub fn datatype_for_adapter(&self, adapter: AdapterKind) -> RegistryResult<DatatypeKind> {
        self.by_adapter
            .get(&adapter)
            .and_then(|position| self.registrations[*position].datatype)
            .ok_or_else(|| RegistryError::NotRegistered {
                lookup: "datatype_for_adapter",
                key: adapter.name().to_string(),
            })
    }

    pub fn index_for_datatype(&self, datatype: DatatypeKind) -> RegistryResult<IndexKind> {
        self.by_datatype
            .get(&datatype)
            .and_then(|position| self.registrations[*position].index)
            .ok_or_else(|| RegistryError::NotRegistered {
                lookup: "index_for_datatype",
                key: datatype.name().to_string(),
            })
    }

    pub fn index_for_adapter(&self, adapter: AdapterKind) -> RegistryResult<IndexKind> {
        self.by_adapter
            .get(&adapter)
            .and_then(|position| self.registrations[*position].index)
            .ok_or_else(|| RegistryError::NotRegistered {
                lookup: "index_for_adapter",
                key: adapter.name().to_string(),
            })
    }

    pub fn is_adapter_registered(&self, adapter: AdapterKind) -> bool {
        self.by_adapter.contains_key(&adapter)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_lookups() {
        let registry = DatatypeRegistry::standard().unwrap();
        assert_eq!(registry.len(), 35);
        assert_eq!(
            registry.adapter_for_datatype(DatatypeKind::Connectivity).unwrap(),
            AdapterKind::Connectivity
        );
        assert_eq!(
            registry.index_for_adapter(AdapterKind::TimeSeriesRegion).unwrap(),
            IndexKind::TimeSeriesRegion
        );
    }

    #[test]
    fn test_adapter_only_and_index_less_pairings() {
        let registry = DatatypeRegistry::standard().unwrap();
        assert!(registry.datatype_for_adapter(AdapterKind::ValueWrapper).is_err());
        assert_eq!(
            registry.index_for_adapter(AdapterKind::DatatypeMeasure).unwrap(),
            IndexKind::DatatypeMeasure
        );
        let err = registry.index_for_datatype(DatatypeKind::Cortex).unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotRegistered {
                lookup: "index_for_datatype",
                key: "Cortex".into()
            }
        );
    }

    #[test]
    fn test_unregistered_kind_fails_fast() {
        let registry = RegistryBuilder::new()
            .register_datatype(
                Some(DatatypeKind::Surface),
                AdapterKind::Surface,
                Some(IndexKind::Surface),
            )
            .unwrap()
            .build();
        assert!(registry.adapter_for_datatype(DatatypeKind::Connectivity).is_err());
        assert!(!registry.is_adapter_registered(AdapterKind::ViewModel));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = RegistryBuilder::new()
            .register_datatype(Some(DatatypeKind::Fcd), AdapterKind::Fcd, Some(IndexKind::Fcd))
            .unwrap()
            .register_datatype(None, AdapterKind::Fcd, None);
        assert!(matches!(result, Err(RegistryError::Duplicate(_))));
    }
}
