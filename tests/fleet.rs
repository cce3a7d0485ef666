use robodriver::{
    bus::{memory::MemoryBus, BusMessage},
    error::RobotError,
    robot_group::{start_event_dispatch, RobotGroup, UNDECODABLE_NAME},
    topics::RobotEvent,
};
use std::{sync::Arc, thread, time::Duration};

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn robots_come_online_and_get_driven() {
    let (bus, receiver) = MemoryBus::new();
    let robot_group = Arc::new(RobotGroup::new(Arc::new(bus.clone())));
    robot_group.subscribe().await.unwrap();
    let _dispatch = start_event_dispatch(robot_group.clone(), receiver);

    for message in [
        BusMessage::new("/robot/b/$online$", "1"),
        BusMessage::new("/robot/a/$online$", "1"),
        BusMessage::new("/robot/a/$name$", "Alpha"),
        BusMessage::new("/robot/b/$name$", vec![0x80_u8, 0x81]),
        BusMessage::new("/robot/c/$name$", "Ghost"),
    ] {
        assert!(bus.inject(message).await.unwrap());
    }
    // not subscribed, never delivered
    assert!(!bus
        .inject(BusMessage::new("/robot/a/motors", "1,1"))
        .await
        .unwrap());

    wait_for(|| {
        robot_group
            .robot("b")
            .map(|robot| robot.name() == UNDECODABLE_NAME)
            .unwrap_or(false)
    })
    .await;

    let robots: Vec<_> = robot_group.robots().collect();
    let ids: Vec<&str> = robots.iter().map(|robot| robot.id()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(robots[0].name(), "Alpha");
    assert!(matches!(
        robot_group.robot("c"),
        Err(RobotError::NotFound(_))
    ));

    robots[0].set_direction(0.0, 80.0).await.unwrap();
    robots[1].set_motors(12.7, -0.2).await.unwrap();
    assert_eq!(
        bus.published(),
        vec![
            BusMessage::new("/robot/a/motors", "80,80"),
            BusMessage::new("/robot/b/motors", "12,0"),
        ]
    );

    bus.inject(BusMessage::new("/robot/a/$online$", "0"))
        .await
        .unwrap();
    wait_for(|| {
        robot_group
            .robot("a")
            .map(|robot| !robot.online())
            .unwrap_or(false)
    })
    .await;
    assert_eq!(robot_group.robots().count(), 2);
}

#[test]
fn queries_never_see_torn_records() {
    let (bus, _receiver) = MemoryBus::new();
    let robot_group = Arc::new(RobotGroup::new(Arc::new(bus)));
    robot_group.handle_event(RobotEvent::Presence {
        id: "r1".to_owned(),
        online: true,
    });

    let writer = {
        let robot_group = robot_group.clone();
        thread::spawn(move || {
            for i in 0..2000 {
                robot_group.handle_event(RobotEvent::Presence {
                    id: "r1".to_owned(),
                    online: i % 2 == 0,
                });
                let name: &'static [u8] = if i % 2 == 0 { b"even" } else { b"odd" };
                robot_group.handle_event(RobotEvent::Name {
                    id: "r1".to_owned(),
                    raw: bytes::Bytes::from_static(name),
                });
            }
        })
    };

    for _ in 0..2000 {
        let robot = robot_group.robot("r1").unwrap();
        assert!(["Unnamed", "even", "odd"].contains(&robot.name()));
        assert_eq!(robot.online(), robot.last_seen().is_some());
        for robot in robot_group.robots() {
            assert_eq!(robot.id(), "r1");
        }
    }
    writer.join().unwrap();
}
