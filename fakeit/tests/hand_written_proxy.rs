// vim: tw=80
//! A proxy written by hand for a Rust trait, forwarding to an interceptor
#![deny(warnings)]

use fakeit::*;

trait Clock {
    fn now(&self) -> u64;
    fn sleep(&self, millis: u64);
    fn split(&self, t: u64, hours: &mut u64) -> u64;
}

struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        1_000
    }

    fn sleep(&self, _millis: u64) {}

    fn split(&self, t: u64, hours: &mut u64) -> u64 {
        *hours = t / 3600;
        t % 3600
    }
}

lazy_static! {
    static ref NOW: Member = Member::method("Clock", "now").returns::<u64>();
    static ref SLEEP: Member = Member::method("Clock", "sleep")
        .param::<u64>("millis");
    static ref SPLIT: Member = Member::method("Clock", "split")
        .param::<u64>("t")
        .ref_param::<u64>("hours")
        .returns::<u64>();
}

/// Wraps a real clock, for fakes that call the base implementation.
struct FakeClock {
    interceptor: Interceptor,
    real: SystemClock,
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        let mut call = BasicCall::new(&NOW, values![])
            .with_base(|_| Ok(Some(Value::new(self.real.now()))));
        self.interceptor.invoke::<u64>(&mut call).unwrap()
    }

    fn sleep(&self, millis: u64) {
        let mut call = BasicCall::new(&SLEEP, values![millis])
            .with_base(|_| {
                self.real.sleep(millis);
                Ok(None)
            });
        self.interceptor.invoke::<()>(&mut call).unwrap()
    }

    fn split(&self, t: u64, hours: &mut u64) -> u64 {
        let mut call = BasicCall::new(&SPLIT, values![t, *hours])
            .with_base(|args| {
                let mut h = *args[1].downcast_ref::<u64>().unwrap();
                let r = self.real.split(t, &mut h);
                args[1] = Value::new(h);
                Ok(Some(Value::new(r)))
            });
        let r = self.interceptor.invoke::<u64>(&mut call).unwrap();
        *hours = *call.argument::<u64>(1).unwrap();
        r
    }
}

fn fake_clock(options: FakeOptions<FakeClock>) -> Fake<FakeClock> {
    Fake::create_with(|interceptor| {
        Ok(FakeClock{interceptor, real: SystemClock})
    }, options).unwrap()
}

/// Code under test only sees the trait.
fn elapsed(clock: &dyn Clock, start: u64) -> u64 {
    clock.now() - start
}

#[test]
fn faked() {
    let fake = fake_clock(FakeOptions::for_interface("Clock"));
    fake.configure(&CallMatcher::new(&NOW)).unwrap()
        .returns(500u64).unwrap();
    assert_eq!(400, elapsed(fake.proxy(), 100));
    fake.assert_that(&fake.call_to(&NOW)).must_have_happened_once();
}

#[test]
fn wrapping() {
    let fake = fake_clock(FakeOptions::for_class("Clock").wrapping());
    assert_eq!(1_000, fake.now());
    let mut hours = 0;
    assert_eq!(1, fake.split(7201, &mut hours));
    assert_eq!(2, hours);
}

#[test]
fn ref_param_assigned_by_rule() {
    let fake = fake_clock(FakeOptions::for_interface("Clock"));
    fake.configure(&fake.call_to(&SPLIT)).unwrap()
        .returns(0u64).unwrap()
        .assigns_out_and_ref_parameters(values![24u64]).unwrap();
    let mut hours = 5;
    assert_eq!(0, fake.split(86_400, &mut hours));
    assert_eq!(24, hours);
}

#[test]
fn unit_methods() {
    let fake = fake_clock(FakeOptions::for_interface("Clock"));
    fake.sleep(10);
    fake.sleep(20);
    fake.assert_that(&fake.call_to(&SLEEP)
        .with(0, ArgumentConstraint::that::<u64, _>(predicate::ge(15)))
        .unwrap()
    ).must_have_happened_once();
}

#[test]
#[should_panic(expected = "Assertion failed for the following call:\n  Clock::sleep(100)")]
fn assertion_failure() {
    let fake = fake_clock(FakeOptions::for_interface("Clock"));
    fake.sleep(10);
    fake.assert_that(&fake.call_to(&SLEEP).with_value(0, 100u64).unwrap())
        .must_have_happened_once();
}
