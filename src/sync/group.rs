//! Shared animation driver for a set of surfaces.
//!
//! A [`SyncGroup`] owns one repeating animator and one [`BufferCache`], and fans the animated
//! value out to its members so every surface in the group shows the band at the same position.
//! The host advances time by calling [`SyncGroup::tick`] from its render thread.
//!
//! Membership is weak: a member whose owning surface was dropped is purged on the next
//! membership change or tick. When the last member leaves, the animator keeps running for a
//! short grace window so a surface re-entering right away does not restart the sweep.

use std::{
    fmt,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use smallvec::SmallVec;

use crate::{
    animation::animator::RepeatingAnimator,
    animation::ease::Interpolation,
    buffer::allocator::{BufferAllocator, SystemAllocator},
    buffer::cache::{BufferCache, BufferState, CacheStats},
    buffer::mask::MaskSpec,
    buffer::spawn::{RayonSpawner, TaskSpawner},
    foundation::core::{Timestamp, lock},
    foundation::error::ShimmerResult,
    foundation::math::lerp_f64,
    geometry::band::PixelRect,
};

/// Default delay between the last member leaving and the animator stopping.
pub const DEFAULT_GRACE_MS: u64 = 500;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_MEMBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique group identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u64);

/// Process-unique member identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(pub u64);

type InvalidateFn = Box<dyn Fn() + Send + Sync>;

/// State a surface shares with the groups it belongs to.
///
/// The surface owns the `Arc`; groups only hold `Weak` references, so membership never keeps a
/// surface alive.
pub struct MemberShared {
    id: MemberId,
    visible: AtomicBool,
    animating: AtomicBool,
    redraw_requested: AtomicBool,
    invalidate: Mutex<Option<InvalidateFn>>,
}

impl MemberShared {
    /// New invisible, non-animating member.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: MemberId(NEXT_MEMBER_ID.fetch_add(1, Ordering::Relaxed)),
            visible: AtomicBool::new(false),
            animating: AtomicBool::new(false),
            redraw_requested: AtomicBool::new(false),
            invalidate: Mutex::new(None),
        })
    }

    /// Member identity.
    pub fn id(&self) -> MemberId {
        self.id
    }

    /// Whether the owning surface is currently shown.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Record the owning surface's visibility.
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    /// Whether the member is registered with a running group.
    pub fn is_animating(&self) -> bool {
        self.animating.load(Ordering::Acquire)
    }

    pub(crate) fn set_animating(&self, animating: bool) {
        self.animating.store(animating, Ordering::Release);
    }

    /// Callback invoked whenever the group asks this member to redraw.
    pub fn set_invalidate(&self, f: impl Fn() + Send + Sync + 'static) {
        *lock(&self.invalidate) = Some(Box::new(f));
    }

    /// Flag a redraw and notify the host.
    pub fn request_redraw(&self) {
        self.redraw_requested.store(true, Ordering::Release);
        if let Some(f) = lock(&self.invalidate).as_ref() {
            f();
        }
    }

    /// Consume a pending redraw request.
    pub fn take_redraw_request(&self) -> bool {
        self.redraw_requested.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for MemberShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberShared")
            .field("id", &self.id)
            .field("visible", &self.is_visible())
            .field("animating", &self.is_animating())
            .finish()
    }
}

/// Band geometry shared by every member of a group, set by the first member to draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupGeometry {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Gradient direction in degrees.
    pub angle_deg: f64,
    /// Band half-thickness as a fraction of the width, in `(0, 0.5)`.
    pub band_fraction: f64,
    /// Opaque core half-thickness as a fraction of the width, in `(0, band_fraction)`.
    pub center_fraction: f64,
}

/// Group construction options.
#[derive(Clone)]
pub struct GroupOpts {
    /// Source of mask and scratch buffers.
    pub allocator: Arc<dyn BufferAllocator>,
    /// Runs buffer builds off the render thread.
    pub spawner: Arc<dyn TaskSpawner>,
    /// Delay before an empty group stops its animator. Zero stops immediately.
    pub grace_ms: u64,
}

impl Default for GroupOpts {
    fn default() -> Self {
        Self {
            allocator: Arc::new(SystemAllocator),
            spawner: Arc::new(RayonSpawner::global()),
            grace_ms: DEFAULT_GRACE_MS,
        }
    }
}

impl fmt::Debug for GroupOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupOpts")
            .field("grace_ms", &self.grace_ms)
            .finish_non_exhaustive()
    }
}

/// What a single [`SyncGroup::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Value propagated this tick; `None` when the group is idle.
    pub value: Option<f64>,
    /// Members asked to redraw.
    pub redraws: usize,
    /// Invisible members told to stop and removed.
    pub stopped_members: usize,
    /// Dead entries purged.
    pub purged: usize,
    /// A buffer allocation failed and the group recovered.
    pub low_memory: bool,
    /// The animator stopped this tick.
    pub stopped: bool,
}

/// Result of asking whether the shared scratch buffer must be re-rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScratchClaim {
    /// The scratch already holds this writer's rendering at this offset.
    Reuse,
    /// The caller must render into the scratch; the memo now names it.
    Render,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ScratchMemo {
    offset: i32,
    writer: MemberId,
}

struct Configured {
    geometry: GroupGeometry,
    spec: MaskSpec,
}

struct GroupState {
    members: Vec<Weak<MemberShared>>,
    value: f64,
    animator: Option<RepeatingAnimator>,
    configured: Option<Configured>,
    pending_stop: Option<Timestamp>,
    last_tick: Option<Timestamp>,
    grace_ms: u64,
    cache: BufferCache,
    scratch_memo: Option<ScratchMemo>,
    recovering: bool,
}

pub(crate) struct GroupInner {
    id: GroupId,
    state: Mutex<GroupState>,
}

/// Shared animation driver.
///
/// Cloning is cheap and yields another handle to the same group. The group, its animator and
/// its buffers live as long as any handle does; dropping the last handle releases the buffers.
#[derive(Clone)]
pub struct SyncGroup {
    inner: Arc<GroupInner>,
}

impl Default for SyncGroup {
    fn default() -> Self {
        Self::new(GroupOpts::default())
    }
}

impl fmt::Debug for SyncGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncGroup")
            .field("id", &self.inner.id)
            .field("members", &self.member_count())
            .field("running", &self.is_running())
            .finish()
    }
}

impl SyncGroup {
    /// Idle group with no members.
    pub fn new(opts: GroupOpts) -> Self {
        let GroupOpts {
            allocator,
            spawner,
            grace_ms,
        } = opts;
        let state = GroupState {
            members: Vec::new(),
            value: 0.0,
            animator: None,
            configured: None,
            pending_stop: None,
            last_tick: None,
            grace_ms,
            cache: BufferCache::new(allocator, spawner),
            scratch_memo: None,
            recovering: false,
        };
        Self {
            inner: Arc::new(GroupInner {
                id: GroupId(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed)),
                state: Mutex::new(state),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<GroupInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<GroupInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Group identity.
    pub fn id(&self) -> GroupId {
        self.inner.id
    }

    /// `true` when both handles refer to the same group.
    pub fn ptr_eq(&self, other: &SyncGroup) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Latest propagated value; frozen while idle.
    ///
    /// Stays in `[0, 1]` for the monotone eases. `Ease::Cycle` swings through `[-1, 1]` and a
    /// custom curve may return any finite value.
    pub fn value(&self) -> f64 {
        lock(&self.inner.state).value
    }

    /// Live members.
    pub fn member_count(&self) -> usize {
        let st = lock(&self.inner.state);
        st.members.iter().filter(|m| m.strong_count() > 0).count()
    }

    /// Whether an animator exists.
    pub fn is_running(&self) -> bool {
        lock(&self.inner.state).animator.is_some()
    }

    /// Deadline of a scheduled stop, if any.
    pub fn pending_stop(&self) -> Option<Timestamp> {
        lock(&self.inner.state).pending_stop
    }

    /// Buffer cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.inner.state).cache.stats()
    }

    /// Register `member`, cancel any scheduled stop and make sure the animator runs.
    ///
    /// The first caller's `duration_ms` and `interpolation` win; later values are ignored while
    /// the animator exists.
    pub fn add_member(
        &self,
        member: &Arc<MemberShared>,
        duration_ms: u64,
        interpolation: Interpolation,
    ) {
        let mut st = lock(&self.inner.state);
        let id = member.id();
        st.members
            .retain(|m| m.upgrade().is_some_and(|live| live.id() != id));
        st.members.push(Arc::downgrade(member));
        st.pending_stop = None;
        Self::ensure_running_locked(&mut st, duration_ms, interpolation);
        member.set_animating(true);
        tracing::debug!(group = self.inner.id.0, member = id.0, "member joined");
    }

    /// Unregister the member with `id`. An empty running group schedules its stop.
    pub fn remove_member(&self, id: MemberId) {
        let mut st = lock(&self.inner.state);
        st.members
            .retain(|m| m.upgrade().is_some_and(|live| live.id() != id));
        self.maybe_schedule_stop_locked(&mut st);
    }

    /// Create the animator if none exists.
    pub fn ensure_running(&self, duration_ms: u64, interpolation: Interpolation) {
        let mut st = lock(&self.inner.state);
        Self::ensure_running_locked(&mut st, duration_ms, interpolation);
    }

    fn ensure_running_locked(st: &mut GroupState, duration_ms: u64, interpolation: Interpolation) {
        if st.animator.is_none() {
            st.animator = Some(RepeatingAnimator::new(duration_ms, interpolation));
            st.last_tick = None;
        }
    }

    fn maybe_schedule_stop_locked(&self, st: &mut GroupState) {
        if st.animator.is_none() || !st.members.is_empty() || st.pending_stop.is_some() {
            return;
        }
        match st.last_tick {
            Some(last) if st.grace_ms > 0 => {
                let deadline = last.saturating_add_ms(st.grace_ms);
                st.pending_stop = Some(deadline);
                tracing::debug!(group = self.inner.id.0, deadline = deadline.0, "stop scheduled");
            }
            _ => self.stop_locked(st),
        }
    }

    /// Cancel the animator and any scheduled stop, and release the group's buffers.
    pub fn stop(&self) {
        let mut st = lock(&self.inner.state);
        self.stop_locked(&mut st);
    }

    fn stop_locked(&self, st: &mut GroupState) {
        st.animator = None;
        st.pending_stop = None;
        st.last_tick = None;
        st.scratch_memo = None;
        st.cache.release();
        tracing::debug!(group = self.inner.id.0, "animator stopped");
    }

    /// Advance to `now`: drain buffer builds, run a due stop, sample the animator and propagate.
    #[tracing::instrument(level = "trace", skip(self), fields(group = self.inner.id.0))]
    pub fn tick(&self, now: Timestamp) -> TickReport {
        let mut report = TickReport::default();
        let value = {
            let mut st = lock(&self.inner.state);
            st.recovering = false;
            report.low_memory = self.drain_locked(&mut st);

            if let Some(deadline) = st.pending_stop
                && now >= deadline
            {
                st.members.retain(|m| m.strong_count() > 0);
                if st.members.is_empty() {
                    self.stop_locked(&mut st);
                    report.stopped = true;
                } else {
                    st.pending_stop = None;
                }
            }

            let Some(animator) = st.animator.as_mut() else {
                return report;
            };
            let value = animator.sample(now);
            st.last_tick = Some(now);
            value
        };

        let outcome = self.propagate(value);
        report.value = Some(value);
        report.redraws = outcome.redraws;
        report.stopped_members = outcome.stopped_members;
        report.purged = outcome.purged;
        report
    }

    /// Store `value` and fan it out: visible members are asked to redraw, invisible ones are
    /// stopped and removed, dead entries are purged.
    ///
    /// Members are notified with the group lock released, so a redraw callback may call back
    /// into the group.
    pub fn propagate(&self, value: f64) -> TickReport {
        let snapshot: SmallVec<[Weak<MemberShared>; 8]> = {
            let mut st = lock(&self.inner.state);
            st.value = value;
            st.members.iter().cloned().collect()
        };

        let mut report = TickReport {
            value: Some(value),
            ..TickReport::default()
        };
        let mut drop_ids: SmallVec<[MemberId; 4]> = SmallVec::new();
        for weak in &snapshot {
            match weak.upgrade() {
                Some(member) if member.is_visible() => {
                    member.request_redraw();
                    report.redraws += 1;
                }
                Some(member) => {
                    member.set_animating(false);
                    drop_ids.push(member.id());
                    report.stopped_members += 1;
                }
                None => report.purged += 1,
            }
        }

        if !drop_ids.is_empty() || report.purged > 0 {
            let mut st = lock(&self.inner.state);
            st.members
                .retain(|m| m.upgrade().is_some_and(|live| !drop_ids.contains(&live.id())));
            for id in &drop_ids {
                Self::forget_scratch_locked(&mut st, *id);
            }
            self.maybe_schedule_stop_locked(&mut st);
        }
        report
    }

    /// Set the shared band geometry. Only the first valid call has an effect; returns whether
    /// this call set it.
    pub fn configure_geometry(&self, geometry: GroupGeometry) -> ShimmerResult<bool> {
        let mut st = lock(&self.inner.state);
        if st.configured.is_some() {
            return Ok(false);
        }
        let spec = MaskSpec::new(
            geometry.width,
            geometry.height,
            geometry.angle_deg,
            geometry.band_fraction,
            geometry.center_fraction,
        )?;
        st.configured = Some(Configured { geometry, spec });
        Ok(true)
    }

    /// Geometry set by the first member, if any.
    pub fn geometry(&self) -> Option<GroupGeometry> {
        lock(&self.inner.state).configured.as_ref().map(|c| c.geometry)
    }

    /// Surface area covered by the mask.
    pub fn mask_rect(&self) -> Option<PixelRect> {
        lock(&self.inner.state)
            .configured
            .as_ref()
            .map(|c| c.spec.rect)
    }

    /// Horizontal pixel offset of the mask for the current value.
    ///
    /// Runs from `-rect.x1` (band just left of the surface) to `width - rect.x0` (just right).
    /// The value is clamped to `[0, 1]` first, so the offset stays between those ends.
    pub fn offset_px(&self) -> Option<i32> {
        let st = lock(&self.inner.state);
        let c = st.configured.as_ref()?;
        let rect = c.spec.rect;
        let from = -(f64::from(rect.x) + f64::from(rect.width));
        let to = f64::from(c.geometry.width) - f64::from(rect.x);
        let offset = lerp_f64(from, to, st.value.clamp(0.0, 1.0)).round();
        Some(offset as i32)
    }

    /// Mask buffer, scheduling its build on first request.
    pub fn mask(&self) -> BufferState {
        let mut st = lock(&self.inner.state);
        if self.drain_locked(&mut st) || st.recovering {
            return BufferState::Unavailable;
        }
        let GroupState {
            cache, configured, ..
        } = &mut *st;
        match configured {
            Some(c) => cache.mask(&c.spec),
            None => BufferState::Unavailable,
        }
    }

    /// Scratch buffer, scheduling its allocation on first request.
    pub fn scratch(&self) -> BufferState {
        let mut st = lock(&self.inner.state);
        if self.drain_locked(&mut st) || st.recovering {
            return BufferState::Unavailable;
        }
        let GroupState {
            cache, configured, ..
        } = &mut *st;
        match configured {
            Some(c) => cache.scratch(&c.spec),
            None => BufferState::Unavailable,
        }
    }

    /// Decide whether `writer` must re-render the shared scratch for `offset`.
    pub fn claim_scratch(&self, offset: i32, writer: MemberId) -> ScratchClaim {
        let mut st = lock(&self.inner.state);
        let memo = ScratchMemo { offset, writer };
        if st.scratch_memo == Some(memo) {
            return ScratchClaim::Reuse;
        }
        st.scratch_memo = Some(memo);
        ScratchClaim::Render
    }

    /// Drop the scratch memo if `writer` made it, so its next draw re-renders the scratch.
    pub fn forget_scratch(&self, writer: MemberId) {
        let mut st = lock(&self.inner.state);
        Self::forget_scratch_locked(&mut st, writer);
    }

    fn forget_scratch_locked(st: &mut GroupState, writer: MemberId) {
        if st.scratch_memo.is_some_and(|memo| memo.writer == writer) {
            st.scratch_memo = None;
        }
    }

    /// Drain finished builds; returns `true` when this drain triggered a recovery.
    fn drain_locked(&self, st: &mut GroupState) -> bool {
        let poll = st.cache.poll();
        if poll.low_memory {
            self.recover_locked(st);
        }
        poll.low_memory
    }

    /// Low-memory recovery: the cache has already released its buffers; drop every member so
    /// surfaces rejoin on their next draw.
    fn recover_locked(&self, st: &mut GroupState) {
        let members = std::mem::take(&mut st.members);
        for member in members.iter().filter_map(Weak::upgrade) {
            member.set_animating(false);
        }
        st.scratch_memo = None;
        st.recovering = true;
        tracing::warn!(
            group = self.inner.id.0,
            members = members.len(),
            "low memory, dropped all members"
        );
        self.maybe_schedule_stop_locked(st);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/group.rs"]
mod tests;
