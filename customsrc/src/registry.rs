// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! The capability registry.
//!
//! Maps every custom source type to its [`SubclassDescriptor`], registering
//! the native type the first time a class is asked for. Each class gets its
//! own `OnceLock` cell, so first-time registration is mutually exclusive per
//! class while different classes register in parallel. The map lock is only
//! held to find or insert a cell.

use std::any::TypeId;
use std::collections::HashMap;
use std::panic;
use std::sync::{Arc, LazyLock, OnceLock, RwLock};

use gstreamer as gst;
use tracing::{debug, info, warn};

use crate::element::SubclassDescriptor;
use crate::extension::find_overrides;
use crate::native::{self, ClassData, GObjectRegistrar, NativeTypeInfo, TypeRegistrar};
use crate::{CustomSrcImpl, Error, Result};

type Cell = Arc<OnceLock<Result<Arc<SubclassDescriptor>>>>;

static GLOBAL: LazyLock<Registry> = LazyLock::new(|| Registry::new(GObjectRegistrar));

/// Process-wide table of registered custom source classes.
pub struct Registry {
    registrar: Box<dyn TypeRegistrar>,
    classes: RwLock<HashMap<TypeId, Cell>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates an empty registry registering native types through `registrar`.
    pub fn new(registrar: impl TypeRegistrar + 'static) -> Self {
        Self {
            registrar: Box::new(registrar),
            classes: RwLock::new(HashMap::new()),
        }
    }

    /// The registry backed by the GLib type system.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Returns the descriptor of `T`, registering the class on first use.
    ///
    /// The outcome of the first registration attempt is kept: later calls
    /// return the same descriptor, or the same error, without registering
    /// again.
    ///
    /// # Errors
    ///
    /// Any registration error for `T`; see [`Error`].
    pub fn get_or_create<T: CustomSrcImpl>(&self) -> Result<Arc<SubclassDescriptor>> {
        let cell = self.cell::<T>();
        cell.get_or_init(|| self.register::<T>()).clone()
    }

    /// Returns the descriptor of `T` if it was registered successfully.
    pub fn lookup<T: CustomSrcImpl>(&self) -> Option<Arc<SubclassDescriptor>> {
        let classes = self.classes.read().unwrap_or_else(|e| e.into_inner());
        classes
            .get(&TypeId::of::<T>())
            .and_then(|cell| cell.get())
            .and_then(|res| res.as_ref().ok())
            .cloned()
    }

    /// Like [`Self::lookup`], but reports a missing class as an error. Never
    /// registers.
    ///
    /// # Errors
    ///
    /// [`Error::NotRegistered`] unless `T` was registered successfully.
    pub fn registered<T: CustomSrcImpl>(&self) -> Result<Arc<SubclassDescriptor>> {
        self.lookup::<T>().ok_or(Error::NotRegistered(T::NAME))
    }

    /// Number of classes with a finished registration attempt.
    pub fn len(&self) -> usize {
        let classes = self.classes.read().unwrap_or_else(|e| e.into_inner());
        classes.values().filter(|cell| cell.get().is_some()).count()
    }

    /// Whether no registration was attempted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers `T` if needed and creates an element of it.
    ///
    /// # Arguments
    ///
    /// * `name` - Optional element name, GStreamer picks a unique one when `None`
    ///
    /// # Errors
    ///
    /// The registration error of `T`, or [`Error::ElementCreation`].
    pub fn create_element<T: CustomSrcImpl>(&self, name: Option<&str>) -> Result<gst::Element> {
        self.get_or_create::<T>()?.instantiate(name)
    }

    fn cell<T: CustomSrcImpl>(&self) -> Cell {
        let key = TypeId::of::<T>();
        {
            let classes = self.classes.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cell) = classes.get(&key) {
                return cell.clone();
            }
        }

        let mut classes = self.classes.write().unwrap_or_else(|e| e.into_inner());
        classes.entry(key).or_default().clone()
    }

    fn register<T: CustomSrcImpl>(&self) -> Result<Arc<SubclassDescriptor>> {
        debug!("Registering custom source '{}'", T::NAME);

        let res = self.try_register::<T>();
        match &res {
            Ok(descriptor) => info!(
                "Registered custom source '{}' with extension points [{}]",
                T::NAME,
                descriptor
                    .adapters()
                    .map(|a| a.point().method_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Err(err) => warn!("Registration of custom source '{}' failed: {}", T::NAME, err),
        }
        res.map(Arc::new)
    }

    fn try_register<T: CustomSrcImpl>(&self) -> Result<SubclassDescriptor> {
        let adapters = find_overrides::<T>()?;
        native::validate_type_name(T::NAME)?;

        let declared = |declaration| Error::DeclarationPanicked {
            name: T::NAME,
            declaration,
        };
        let metadata = panic::catch_unwind(T::metadata).map_err(|_| declared("metadata"))?;
        metadata.validate()?;
        let pad_template = panic::catch_unwind(T::pad_template)
            .map_err(|_| declared("pad_template"))?
            .build()?;

        let class_data = Box::into_raw(Box::new(ClassData::new(
            &metadata,
            adapters.values().copied().collect(),
        )?));

        let registered = NativeTypeInfo::for_subclass::<T>(class_data)
            .and_then(|info| self.registrar.register_static(&info));
        let type_handle = match registered {
            Ok(handle) => handle,
            Err(err) => {
                unsafe { native::reclaim_class_data(class_data) };
                return Err(err);
            }
        };

        Ok(SubclassDescriptor::new::<T>(
            type_handle,
            metadata,
            pad_template,
            adapters,
        ))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(GObjectRegistrar)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Barrier, Mutex, mpsc};
    use std::thread;
    use std::time::Duration;

    use glib::prelude::*;
    use gstreamer_base as gst_base;

    use super::*;
    use crate::extension::ExtensionPoint;
    use crate::native::TypeHandle;
    use crate::{SubclassInfo, custom_src_impl};

    /// Counts registrations per type name without touching GLib.
    #[derive(Default)]
    struct RecordingRegistrar {
        calls: Arc<Mutex<Vec<String>>>,
        fail_with: Option<Error>,
        gate: Option<(String, Arc<Barrier>)>,
    }

    impl RecordingRegistrar {
        fn count(&self, name: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|n| *n == name).count()
        }
    }

    impl TypeRegistrar for Arc<RecordingRegistrar> {
        fn register_static(&self, info: &NativeTypeInfo) -> Result<TypeHandle> {
            self.calls.lock().unwrap().push(info.name.clone());
            if let Some((name, barrier)) = &self.gate {
                if *name == info.name {
                    barrier.wait();
                    barrier.wait();
                }
            }
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(TypeHandle::from(gst_base::BaseSrc::static_type())),
            }
        }
    }

    fn registry() -> (Registry, Arc<RecordingRegistrar>) {
        gst::init().unwrap();
        let registrar = Arc::new(RecordingRegistrar::default());
        (Registry::new(registrar.clone()), registrar)
    }

    #[derive(Default)]
    struct FillOnly;

    impl SubclassInfo for FillOnly {
        const NAME: &'static str = "CustomSrcRegistryFillOnly";
    }

    custom_src_impl! {
        impl CustomSrcImpl for FillOnly {
            fn fill(
                &self,
                _offset: u64,
                _buffer: &mut gst::BufferRef,
            ) -> std::result::Result<gst::FlowSuccess, gst::FlowError> {
                Ok(gst::FlowSuccess::Ok)
            }
        }
    }

    #[derive(Default)]
    struct Seekable;

    impl SubclassInfo for Seekable {
        const NAME: &'static str = "CustomSrcRegistrySeekable";
    }

    custom_src_impl! {
        impl CustomSrcImpl for Seekable {
            fn is_seekable(&self) -> bool {
                true
            }
        }
    }

    #[derive(Default)]
    struct BadName;

    impl SubclassInfo for BadName {
        const NAME: &'static str = "no spaces allowed";
    }

    impl CustomSrcImpl for BadName {}

    #[derive(Default)]
    struct BrokenMetadata;

    impl SubclassInfo for BrokenMetadata {
        const NAME: &'static str = "CustomSrcRegistryBrokenMetadata";

        fn metadata() -> crate::ElementMetadata {
            panic!("metadata unavailable");
        }
    }

    impl CustomSrcImpl for BrokenMetadata {}

    #[test]
    fn get_or_create_is_idempotent() {
        let (registry, registrar) = registry();
        assert!(registry.is_empty());
        assert_eq!(
            registry.registered::<FillOnly>().unwrap_err(),
            Error::NotRegistered(FillOnly::NAME)
        );

        let first = registry.get_or_create::<FillOnly>().unwrap();
        let second = registry.get_or_create::<FillOnly>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registrar.count(FillOnly::NAME), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn concurrent_first_use_registers_once() {
        let (registry, registrar) = registry();
        let registry = Arc::new(registry);
        let start = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let start = start.clone();
                thread::spawn(move || {
                    start.wait();
                    registry.get_or_create::<Seekable>().unwrap()
                })
            })
            .collect();

        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(registrar.count(Seekable::NAME), 1);
        assert!(descriptors.iter().all(|d| Arc::ptr_eq(d, &descriptors[0])));
    }

    #[test]
    fn slow_registration_does_not_block_other_classes() {
        gst::init().unwrap();
        let gate = Arc::new(Barrier::new(2));
        let registrar = Arc::new(RecordingRegistrar {
            gate: Some((Seekable::NAME.to_owned(), gate.clone())),
            ..Default::default()
        });
        let registry = Arc::new(Registry::new(registrar.clone()));

        let slow = {
            let registry = registry.clone();
            thread::spawn(move || registry.get_or_create::<Seekable>().map(|_| ()))
        };
        // Seekable is now parked inside the registrar.
        gate.wait();

        let (tx, rx) = mpsc::channel();
        {
            let registry = registry.clone();
            thread::spawn(move || {
                tx.send(registry.get_or_create::<FillOnly>().is_ok()).unwrap();
            });
        }
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
        assert!(registry.lookup::<Seekable>().is_none());

        gate.wait();
        slow.join().unwrap().unwrap();
        assert!(registry.lookup::<Seekable>().is_some());
    }

    #[test]
    fn failures_are_cached() {
        gst::init().unwrap();
        let registrar = Arc::new(RecordingRegistrar {
            fail_with: Some(Error::TypeNameTaken(FillOnly::NAME.to_owned())),
            ..Default::default()
        });
        let registry = Registry::new(registrar.clone());

        let first = registry.get_or_create::<FillOnly>().unwrap_err();
        let second = registry.get_or_create::<FillOnly>().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(registrar.count(FillOnly::NAME), 1);
        assert!(registry.lookup::<FillOnly>().is_none());
    }

    #[test]
    fn panicking_declarations_fail_once_and_stay_failed() {
        let (registry, registrar) = registry();
        let expected = Error::DeclarationPanicked {
            name: BrokenMetadata::NAME,
            declaration: "metadata",
        };

        assert_eq!(registry.get_or_create::<BrokenMetadata>().unwrap_err(), expected);
        assert_eq!(registry.get_or_create::<BrokenMetadata>().unwrap_err(), expected);
        assert_eq!(registrar.count(BrokenMetadata::NAME), 0);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup::<BrokenMetadata>().is_none());
    }

    #[test]
    fn invalid_names_never_reach_the_registrar() {
        let (registry, registrar) = registry();
        assert_eq!(
            registry.get_or_create::<BadName>().unwrap_err(),
            Error::InvalidTypeName(BadName::NAME.to_owned())
        );
        assert_eq!(registrar.count(BadName::NAME), 0);
    }

    #[test]
    fn fill_only_class_installs_only_create() {
        let (registry, _) = registry();
        let descriptor = registry.get_or_create::<FillOnly>().unwrap();

        assert!(descriptor.has_adapter(ExtensionPoint::Fill));
        assert!(!descriptor.has_adapter(ExtensionPoint::IsSeekable));

        let mut klass: gst_base::ffi::GstBaseSrcClass =
            unsafe { std::mem::MaybeUninit::zeroed().assume_init() };
        descriptor.install_into(&mut klass);
        assert!(klass.create.is_some());
        assert!(klass.is_seekable.is_none());
        assert!(klass.fill.is_none());
    }

    #[test]
    fn default_metadata_and_template() {
        let (registry, _) = registry();
        let descriptor = registry.get_or_create::<Seekable>().unwrap();

        assert_eq!(descriptor.metadata().long_name, Seekable::NAME);
        assert_eq!(descriptor.pad_template().name_template().to_string(), "src");
        assert!(descriptor.pad_template().caps().is_any());
    }
}
