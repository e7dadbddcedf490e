use super::{Communicator, ROOT};
use crate::{Error, Result};
use heq_core::Intensity;
use heq_imgproc::{reduce, ChunkPlan, Histogram};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Payload = Box<dyn Any + Send>;

struct State {
    arrived: usize,
    generation: u64,
    aborted: bool,
    slots: Vec<Option<Payload>>,
}

/// Shared rendezvous for one run of a worker group.
///
/// Each rank owns one deposit slot. A collective is a deposit followed by a
/// barrier, a copy out of the slots, and a second barrier so that no slot is
/// reused while a peer still reads it.
pub struct World {
    size: usize,
    timeout: Duration,
    state: Mutex<State>,
    cv: Condvar,
    collectives: Arc<AtomicUsize>,
}

impl World {
    pub fn new(size: usize, timeout: Duration, collectives: Arc<AtomicUsize>) -> Result<Arc<Self>> {
        if size == 0 {
            return Err(Error::RuntimeError("world size must be >= 1".into()));
        }
        Ok(Arc::new(Self {
            size,
            timeout,
            state: Mutex::new(State {
                arrived: 0,
                generation: 0,
                aborted: false,
                slots: (0..size).map(|_| None).collect(),
            }),
            cv: Condvar::new(),
            collectives,
        }))
    }

    pub fn communicators(self: &Arc<Self>) -> Vec<ThreadComm> {
        (0..self.size)
            .map(|rank| ThreadComm {
                rank,
                world: self.clone(),
            })
            .collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    pub fn abort(&self) {
        let mut st = self.state.lock();
        if !st.aborted {
            st.aborted = true;
            tracing::debug!("worker group aborted");
        }
        self.cv.notify_all();
    }

    fn begin(&self, op: &'static str, rank: usize) -> Result<()> {
        self.collectives.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("rank {} enters {}", rank, op);
        if self.is_aborted() {
            return Err(Error::Aborted { op });
        }
        Ok(())
    }

    fn wait(&self, op: &'static str) -> Result<()> {
        let mut st = self.state.lock();
        if st.aborted {
            return Err(Error::Aborted { op });
        }

        let generation = st.generation;
        st.arrived += 1;
        if st.arrived == self.size {
            st.arrived = 0;
            st.generation = st.generation.wrapping_add(1);
            self.cv.notify_all();
            return Ok(());
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            if st.generation != generation {
                return Ok(());
            }
            if st.aborted {
                return Err(Error::Aborted { op });
            }
            if self.cv.wait_until(&mut st, deadline).timed_out() {
                if st.generation != generation {
                    return Ok(());
                }
                st.aborted = true;
                self.cv.notify_all();
                tracing::warn!("{} timed out after {:?}", op, self.timeout);
                return Err(Error::Timeout {
                    op,
                    after: self.timeout,
                });
            }
        }
    }

    fn deposit(&self, rank: usize, payload: Payload) {
        self.state.lock().slots[rank] = Some(payload);
    }

    fn clear(&self, rank: usize) {
        self.state.lock().slots[rank] = None;
    }

    fn take<T: 'static>(&self, rank: usize, op: &'static str) -> Result<T> {
        let payload = self.state.lock().slots[rank].take().ok_or_else(|| {
            Error::Collective(format!("{}: rank {} deposited nothing", op, rank))
        })?;
        payload.downcast::<T>().map(|b| *b).map_err(|_| {
            Error::Collective(format!("{}: unexpected payload type from rank {}", op, rank))
        })
    }

    fn peek<T: Clone + 'static>(&self, rank: usize, op: &'static str) -> Result<T> {
        let st = self.state.lock();
        st.slots[rank]
            .as_ref()
            .and_then(|p| p.downcast_ref::<T>())
            .cloned()
            .ok_or_else(|| Error::Collective(format!("{}: no value from rank {}", op, rank)))
    }
}

/// One rank's handle on a [`World`].
pub struct ThreadComm {
    rank: usize,
    world: Arc<World>,
}

impl ThreadComm {
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    fn check_plan(&self, plan: &ChunkPlan, op: &'static str) -> Result<()> {
        if plan.len() != self.world.size {
            return Err(Error::Collective(format!(
                "{}: plan has {} chunks for {} workers",
                op,
                plan.len(),
                self.world.size
            )));
        }
        Ok(())
    }

    fn root_only<T>(value: Option<T>, op: &'static str) -> Result<T> {
        value.ok_or_else(|| Error::Collective(format!("{}: root supplied no data", op)))
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.world.size
    }

    fn barrier(&self) -> Result<()> {
        self.world.begin("barrier", self.rank)?;
        self.world.wait("barrier")
    }

    fn broadcast<T>(&self, value: Option<T>) -> Result<T>
    where
        T: Clone + Send + 'static,
    {
        const OP: &str = "broadcast";
        self.world.begin(OP, self.rank)?;

        if self.is_root() {
            let value = Self::root_only(value, OP)?;
            self.world.deposit(ROOT, Box::new(value.clone()));
            self.world.wait(OP)?;
            self.world.wait(OP)?;
            self.world.clear(ROOT);
            Ok(value)
        } else {
            self.world.wait(OP)?;
            let value = self.world.peek::<T>(ROOT, OP)?;
            self.world.wait(OP)?;
            Ok(value)
        }
    }

    fn scatter(&self, plan: &ChunkPlan, data: Option<&[Intensity]>) -> Result<Vec<Intensity>> {
        const OP: &str = "scatter";
        self.world.begin(OP, self.rank)?;
        self.check_plan(plan, OP)?;

        if self.is_root() {
            let data = Self::root_only(data, OP)?;
            if data.len() != plan.total() {
                return Err(Error::Collective(format!(
                    "{}: buffer holds {} values, plan covers {}",
                    OP,
                    data.len(),
                    plan.total()
                )));
            }
            let ranges = plan.ranges();
            for (rank, range) in ranges.iter().enumerate().skip(1) {
                self.world.deposit(rank, Box::new(data[range.clone()].to_vec()));
            }
            let own = data[ranges[ROOT].clone()].to_vec();
            self.world.wait(OP)?;
            self.world.wait(OP)?;
            Ok(own)
        } else {
            self.world.wait(OP)?;
            let chunk = self.world.take::<Vec<Intensity>>(self.rank, OP)?;
            self.world.wait(OP)?;
            Ok(chunk)
        }
    }

    fn reduce(&self, local: &Histogram) -> Result<Option<Histogram>> {
        const OP: &str = "reduce";
        self.world.begin(OP, self.rank)?;

        if self.is_root() {
            self.world.wait(OP)?;
            let mut partials = Vec::with_capacity(self.world.size);
            partials.push(local.clone());
            for rank in 1..self.world.size {
                partials.push(self.world.take::<Histogram>(rank, OP)?);
            }
            let global = reduce(&partials)?;
            self.world.wait(OP)?;
            Ok(Some(global))
        } else {
            self.world.deposit(self.rank, Box::new(local.clone()));
            self.world.wait(OP)?;
            self.world.wait(OP)?;
            Ok(None)
        }
    }

    fn gather(
        &self,
        plan: &ChunkPlan,
        local: &[Intensity],
        out: Option<&mut [Intensity]>,
    ) -> Result<()> {
        const OP: &str = "gather";
        self.world.begin(OP, self.rank)?;
        self.check_plan(plan, OP)?;

        let own = plan.ranges()[self.rank].clone();
        if local.len() != own.len() {
            return Err(Error::Collective(format!(
                "{}: rank {} holds {} values, plan assigns {}",
                OP,
                self.rank,
                local.len(),
                own.len()
            )));
        }

        if self.is_root() {
            let out = Self::root_only(out, OP)?;
            if out.len() != plan.total() {
                return Err(Error::Collective(format!(
                    "{}: output holds {} values, plan covers {}",
                    OP,
                    out.len(),
                    plan.total()
                )));
            }
            self.world.wait(OP)?;
            out[own].copy_from_slice(local);
            for (rank, range) in plan.ranges().into_iter().enumerate().skip(1) {
                let chunk = self.world.take::<Vec<Intensity>>(rank, OP)?;
                if chunk.len() != range.len() {
                    return Err(Error::Collective(format!(
                        "{}: rank {} returned {} values, expected {}",
                        OP,
                        rank,
                        chunk.len(),
                        range.len()
                    )));
                }
                out[range].copy_from_slice(&chunk);
            }
            self.world.wait(OP)?;
        } else {
            self.world.deposit(self.rank, Box::new(local.to_vec()));
            self.world.wait(OP)?;
            self.world.wait(OP)?;
        }
        Ok(())
    }

    fn abort(&self) {
        self.world.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heq_imgproc::{accumulate, plan};
    use std::thread;

    fn world(size: usize, timeout: Duration) -> Arc<World> {
        World::new(size, timeout, Arc::new(AtomicUsize::new(0))).unwrap()
    }

    #[test]
    fn test_broadcast_reaches_every_rank() {
        let w = world(4, Duration::from_secs(5));
        let comms = w.communicators();
        let results: Vec<u64> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|c| {
                    s.spawn(move || {
                        let v = if c.is_root() { Some(42u64) } else { None };
                        c.broadcast(v).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results, vec![42; 4]);
    }

    #[test]
    fn test_scatter_gather_roundtrip() {
        let w = world(3, Duration::from_secs(5));
        let comms = w.communicators();
        let data: Vec<Intensity> = (0..11).collect();
        let p = plan(data.len(), 3).unwrap();
        let mut out = vec![0; data.len()];

        thread::scope(|s| {
            let (root, rest) = comms.split_first().unwrap();
            for c in rest {
                let p = &p;
                s.spawn(move || {
                    let mut chunk = c.scatter(p, None).unwrap();
                    for v in chunk.iter_mut() {
                        *v += 100;
                    }
                    c.gather(p, &chunk, None).unwrap();
                });
            }
            let mut chunk = root.scatter(&p, Some(data.as_slice())).unwrap();
            assert_eq!(chunk, vec![0, 1, 2]);
            for v in chunk.iter_mut() {
                *v += 100;
            }
            root.gather(&p, &chunk, Some(out.as_mut_slice())).unwrap();
        });

        let expected: Vec<Intensity> = (100..111).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_reduce_sums_on_root_only() {
        let w = world(3, Duration::from_secs(5));
        let comms = w.communicators();
        let chunks: [Vec<Intensity>; 3] = [vec![0, 0], vec![1, 3], vec![3]];

        let results: Vec<Option<Histogram>> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .zip(&chunks)
                .map(|(c, chunk)| {
                    s.spawn(move || {
                        let local = accumulate(chunk, 4).unwrap();
                        c.reduce(&local).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results[0].as_ref().unwrap().counts(), &[2, 1, 0, 2]);
        assert!(results[1].is_none());
        assert!(results[2].is_none());
    }

    #[test]
    fn test_missing_peer_times_out() {
        let w = world(2, Duration::from_millis(50));
        let comms = w.communicators();
        let err = comms[0].barrier().unwrap_err();
        assert!(matches!(err, Error::Timeout { op: "barrier", .. }));
        assert!(w.is_aborted());
    }

    #[test]
    fn test_abort_wakes_blocked_peer() {
        let w = world(2, Duration::from_secs(30));
        let comms = w.communicators();
        thread::scope(|s| {
            let blocked = s.spawn(|| comms[1].barrier());
            thread::sleep(Duration::from_millis(20));
            comms[0].abort();
            let err = blocked.join().unwrap().unwrap_err();
            assert!(err.is_secondary());
        });
    }

    #[test]
    fn test_single_rank_collectives_do_not_block() {
        let w = world(1, Duration::from_millis(10));
        let comms = w.communicators();
        let c = &comms[0];
        let data: Vec<Intensity> = vec![5, 6, 7];
        let p = plan(3, 1).unwrap();
        let chunk = c.scatter(&p, Some(data.as_slice())).unwrap();
        let mut out = vec![0; 3];
        c.gather(&p, &chunk, Some(out.as_mut_slice())).unwrap();
        assert_eq!(out, data);
        assert_eq!(c.broadcast(Some("x")).unwrap(), "x");
    }
}
