use std::collections::BTreeMap;

use crate::instance::{ClipInstance, InstanceHandle};

struct Entry {
    instance: ClipInstance,
    /// Every device collection the instance was added to
    devices: Vec<usize>,
}

/// Owns every playing clip instance and indexes them by device.
///
/// An instance targeting all devices is stored once and listed in each device's collection.
/// Instances iterate in creation order since handles are allocated monotonically.
pub struct PlaybackRegistry {
    entries: BTreeMap<InstanceHandle, Entry>,
    by_device: Vec<Vec<InstanceHandle>>,
}

impl PlaybackRegistry {
    pub fn new(device_count: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            by_device: vec![Vec::new(); device_count],
        }
    }

    /// Grow the per-device table. Never shrinks; stale indices are filtered by the writer.
    pub fn ensure_devices(&mut self, device_count: usize) {
        if self.by_device.len() < device_count {
            self.by_device.resize(device_count, Vec::new());
        }
    }

    pub fn device_count(&self) -> usize {
        self.by_device.len()
    }

    /// Take ownership of `instance` and list it under each of `devices`.
    pub fn insert(&mut self, instance: ClipInstance, devices: Vec<usize>) {
        let handle = instance.handle();
        for &device in &devices {
            self.ensure_devices(device + 1);
            self.by_device[device].push(handle);
        }
        self.entries.insert(handle, Entry { instance, devices });
    }

    /// Remove an instance from every device collection at once. Returns it with the devices it was on.
    pub fn remove(&mut self, handle: InstanceHandle) -> Option<(ClipInstance, Vec<usize>)> {
        let entry = self.entries.remove(&handle)?;
        for &device in &entry.devices {
            if let Some(list) = self.by_device.get_mut(device) {
                list.retain(|h| *h != handle);
            }
        }
        Some((entry.instance, entry.devices))
    }

    /// Empty the registry, handing back everything that was in it.
    pub fn drain(&mut self) -> Vec<(ClipInstance, Vec<usize>)> {
        for list in self.by_device.iter_mut() {
            list.clear();
        }
        std::mem::take(&mut self.entries)
            .into_values()
            .map(|e| (e.instance, e.devices))
            .collect()
    }

    pub fn get(&self, handle: InstanceHandle) -> Option<&ClipInstance> {
        self.entries.get(&handle).map(|e| &e.instance)
    }

    pub fn get_mut(&mut self, handle: InstanceHandle) -> Option<&mut ClipInstance> {
        self.entries.get_mut(&handle).map(|e| &mut e.instance)
    }

    pub fn devices_of(&self, handle: InstanceHandle) -> &[usize] {
        self.entries.get(&handle).map(|e| e.devices.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, handle: InstanceHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Handles registered under `device`, in registration order.
    pub fn handles_on(&self, device: usize) -> &[InstanceHandle] {
        self.by_device.get(device).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub fn instances_on(&self, device: usize) -> impl Iterator<Item = &ClipInstance> + '_ {
        self.handles_on(device).iter().filter_map(|h| self.get(*h))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClipInstance, &[usize])> + '_ {
        self.entries.values().map(|e| (&e.instance, e.devices.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&mut ClipInstance, &[usize])> + '_ {
        self.entries.values_mut().map(|e| (&mut e.instance, e.devices.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
