//! Fixed-base three-link arm swinging in the x-z plane.

use qptasks_rbd::MultiBody;

/// Three y-axis revolute joints, 0.4 m / 0.3 m / 0.2 m links, tool frame at
/// the tip. At zero configuration the arm points along +x at height 0.5 m.
pub const PLANAR_ARM_URDF: &str = r#"
<robot name="planar_arm">
    <link name="base">
        <inertial>
            <mass value="5.0"/>
            <inertia ixx="0.05" ixy="0" ixz="0" iyy="0.05" iyz="0" izz="0.05"/>
        </inertial>
    </link>
    <link name="link1">
        <inertial>
            <origin xyz="0.2 0 0"/>
            <mass value="2.0"/>
            <inertia ixx="0.002" ixy="0" ixz="0" iyy="0.03" iyz="0" izz="0.03"/>
        </inertial>
    </link>
    <link name="link2">
        <inertial>
            <origin xyz="0.15 0 0"/>
            <mass value="1.5"/>
            <inertia ixx="0.001" ixy="0" ixz="0" iyy="0.012" iyz="0" izz="0.012"/>
        </inertial>
    </link>
    <link name="link3">
        <inertial>
            <origin xyz="0.1 0 0"/>
            <mass value="0.5"/>
            <inertia ixx="0.0005" ixy="0" ixz="0" iyy="0.002" iyz="0" izz="0.002"/>
        </inertial>
    </link>
    <link name="tool"/>
    <joint name="shoulder" type="revolute">
        <parent link="base"/>
        <child link="link1"/>
        <origin xyz="0 0 0.5"/>
        <axis xyz="0 1 0"/>
        <limit lower="-3.14" upper="3.14" effort="150" velocity="3"/>
    </joint>
    <joint name="elbow" type="revolute">
        <parent link="link1"/>
        <child link="link2"/>
        <origin xyz="0.4 0 0"/>
        <axis xyz="0 1 0"/>
        <limit lower="-3.14" upper="3.14" effort="80" velocity="3"/>
    </joint>
    <joint name="wrist" type="revolute">
        <parent link="link2"/>
        <child link="link3"/>
        <origin xyz="0.3 0 0"/>
        <axis xyz="0 1 0"/>
        <limit lower="-3.14" upper="3.14" effort="30" velocity="3"/>
    </joint>
    <joint name="tool_fixed" type="fixed">
        <parent link="link3"/>
        <child link="tool"/>
        <origin xyz="0.2 0 0"/>
    </joint>
</robot>
"#;

/// The planar arm with its base bolted to the world.
pub fn planar_arm() -> MultiBody {
    qptasks_rbd::urdf::parse_string(PLANAR_ARM_URDF, false).expect("planar arm URDF is valid")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
